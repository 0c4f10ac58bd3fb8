//! Task file schema (spec §3.4).
//!
//! A task is a small JSON file. Most of its fields are plain strings used
//! verbatim by the host agent's todo UI; the part this crate cares about is
//! the metadata block embedded in `description`, which carries the
//! provenance and typing this crate's projections key off of.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const TASK_ID_WIDTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskType {
    Mission,
    Experiment,
    Detour,
    Phase,
    Bug,
    Task,
    #[serde(rename = "DELEG_PLAN")]
    DelegPlan,
    #[serde(rename = "SUBPLAN")]
    Subplan,
    Archive,
    #[serde(rename = "GH_ISSUE")]
    GhIssue,
    Sentinel,
}

impl TaskType {
    /// Infer a type from the emoji prefix convention used when a task's
    /// description carries no metadata block (§3.4: "a fallback parser
    /// infers type from subject-line emoji prefix if the block is absent").
    pub fn from_subject_emoji(subject: &str) -> Option<TaskType> {
        let prefix = subject.trim_start().chars().next()?;
        match prefix {
            '🎯' => Some(TaskType::Mission),
            '🧪' => Some(TaskType::Experiment),
            '🔀' => Some(TaskType::Detour),
            '📋' => Some(TaskType::Phase),
            '🐛' => Some(TaskType::Bug),
            '📦' => Some(TaskType::DelegPlan),
            '📄' => Some(TaskType::Subplan),
            '🗄' => Some(TaskType::Archive),
            '🔗' => Some(TaskType::GhIssue),
            '🛡' => Some(TaskType::Sentinel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub breadcrumb: String,
    pub description: String,
    pub agent: String,
}

/// The YAML-ish metadata block embedded in `Task::description`.
///
/// `custom` preserves any fields this crate does not model by name, so that
/// a round-trip through `Task` never drops data a future task type needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskMetadata {
    pub task_type: Option<TaskType>,
    pub creation_breadcrumb: Option<String>,
    pub created_cycle: Option<u64>,
    pub created_by: Option<String>,
    pub parent_id: Option<String>,
    pub plan_ca_ref: Option<String>,
    pub repo: Option<String>,
    pub target_version: Option<String>,
    pub completion_breadcrumb: Option<String>,
    #[serde(default)]
    pub updates: Vec<TaskUpdate>,
    #[serde(default)]
    pub custom: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub archived: bool,
    pub archived_at: Option<String>,
}

const METADATA_OPEN: &str = "<!-- macf:metadata";
const METADATA_CLOSE: &str = "-->";

impl TaskMetadata {
    /// Parse the metadata block out of a task description, if present.
    /// The block is delimited by an HTML-comment-style tag pair wrapping a
    /// JSON object, so that it disappears from any plain-text rendering of
    /// the description.
    pub fn extract(description: &str) -> Result<Option<TaskMetadata>> {
        let Some(start) = description.find(METADATA_OPEN) else {
            return Ok(None);
        };
        let body_start = start + METADATA_OPEN.len();
        let Some(end_rel) = description[body_start..].find(METADATA_CLOSE) else {
            return Err(Error::InvalidTaskMetadata(
                "unterminated metadata block".to_string(),
            ));
        };
        let body = description[body_start..body_start + end_rel].trim();
        let metadata: TaskMetadata = serde_json::from_str(body)?;
        Ok(Some(metadata))
    }

    /// Render this metadata back into an embeddable block.
    pub fn to_block(&self) -> Result<String> {
        let body = serde_json::to_string(self)?;
        Ok(format!("{METADATA_OPEN}\n{body}\n{METADATA_CLOSE}"))
    }

    /// Replace (or append) the metadata block within a description, leaving
    /// any free text before it untouched.
    pub fn upsert_into(&self, description: &str) -> Result<String> {
        let block = self.to_block()?;
        match description.find(METADATA_OPEN) {
            Some(start) => {
                let body_start = start + METADATA_OPEN.len();
                let end_rel = description[body_start..]
                    .find(METADATA_CLOSE)
                    .ok_or_else(|| {
                        Error::InvalidTaskMetadata("unterminated metadata block".to_string())
                    })?;
                let end = body_start + end_rel + METADATA_CLOSE.len();
                Ok(format!("{}{}{}", &description[..start], block, &description[end..]))
            }
            None => {
                let mut out = description.to_string();
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(&block);
                Ok(out)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub subject: String,
    pub description: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub blocks: Vec<String>,
    #[serde(default, rename = "blockedBy")]
    pub blocked_by: Vec<String>,
    #[serde(default, rename = "activeForm")]
    pub active_form: String,
}

impl Task {
    /// The effective task type: the metadata block if present and typed,
    /// otherwise the subject-emoji fallback.
    pub fn task_type(&self) -> Result<Option<TaskType>> {
        if let Some(metadata) = TaskMetadata::extract(&self.description)? {
            if let Some(task_type) = metadata.task_type {
                return Ok(Some(task_type));
            }
        }
        Ok(TaskType::from_subject_emoji(&self.subject))
    }

    pub fn metadata(&self) -> Result<Option<TaskMetadata>> {
        TaskMetadata::extract(&self.description)
    }

    pub fn is_sentinel(&self) -> Result<bool> {
        Ok(matches!(self.task_type()?, Some(TaskType::Sentinel)))
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata_block(task_type: &str) -> String {
        format!(
            "{METADATA_OPEN}\n{{\"task_type\":\"{task_type}\",\"created_cycle\":3}}\n{METADATA_CLOSE}"
        )
    }

    #[test]
    fn extracts_metadata_block() {
        let description = format!("Some free text.\n\n{}", metadata_block("BUG"));
        let metadata = TaskMetadata::extract(&description).unwrap().unwrap();
        assert_eq!(metadata.task_type, Some(TaskType::Bug));
        assert_eq!(metadata.created_cycle, Some(3));
    }

    #[test]
    fn missing_block_falls_back_to_emoji() {
        let task = Task {
            id: "001".into(),
            subject: "🐛 fix the thing".into(),
            description: "no metadata here".into(),
            status: TaskStatus::Pending,
            blocks: vec![],
            blocked_by: vec![],
            active_form: String::new(),
        };
        assert_eq!(task.task_type().unwrap(), Some(TaskType::Bug));
    }

    #[test]
    fn upsert_replaces_existing_block_in_place() {
        let description = format!("intro\n\n{}\n\ntail", metadata_block("BUG"));
        let mut metadata = TaskMetadata::extract(&description).unwrap().unwrap();
        metadata.task_type = Some(TaskType::Mission);
        let updated = metadata.upsert_into(&description).unwrap();
        assert!(updated.starts_with("intro\n\n"));
        assert!(updated.trim_end().ends_with("tail"));
        let reparsed = TaskMetadata::extract(&updated).unwrap().unwrap();
        assert_eq!(reparsed.task_type, Some(TaskType::Mission));
    }

    #[test]
    fn unterminated_block_is_an_error() {
        let description = format!("{METADATA_OPEN}\n{{}}");
        assert!(TaskMetadata::extract(&description).is_err());
    }
}
