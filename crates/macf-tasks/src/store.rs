//! The task store itself (spec §4.5).

use std::path::{Path, PathBuf};

use macf_eventlog::EventLog;
use macf_types::event::TaskLifecycleData;
use macf_types::task::TASK_ID_WIDTH;
use macf_types::{Breadcrumb, EventKind, Task, TaskMetadata, TaskStatus, TaskType};

use crate::error::{Error, Result};
use crate::guard::{DirectoryGuard, SENTINEL_MODE};

/// Task types that require a `plan_ca_ref` pointing at a real plan
/// artifact (spec §3.4, §8 invariant 8).
pub const PLAN_REF_REQUIRED: &[TaskType] = &[
    TaskType::Mission,
    TaskType::Experiment,
    TaskType::Detour,
    TaskType::DelegPlan,
    TaskType::Subplan,
];

/// The host agent's ephemeral plan directory — `plan_ca_ref` must never
/// point inside it (spec §3.4, §9 design note on the two plan storage
/// conventions).
pub const FORBIDDEN_PLAN_PREFIX: &str = ".claude/plans/";

pub const SENTINEL_ID: &str = "000";

pub struct TaskStore {
    dir: PathBuf,
}

impl TaskStore {
    pub fn new(session_tasks_dir: impl Into<PathBuf>) -> Self {
        Self { dir: session_tasks_dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn task_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    pub fn read_all(&self) -> Result<Vec<Task>> {
        let mut tasks = Vec::new();
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(tasks),
            Err(err) => return Err(err.into()),
        };
        for entry in entries {
            let entry = entry?;
            if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let contents = std::fs::read_to_string(entry.path())?;
            tasks.push(serde_json::from_str(&contents)?);
        }
        tasks.sort_by(|a: &Task, b: &Task| a.id.cmp(&b.id));
        Ok(tasks)
    }

    pub fn read(&self, id: &str) -> Result<Task> {
        let contents = std::fs::read_to_string(self.task_path(id))
            .map_err(|_| Error::NotFound(id.to_string()))?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Atomic write: write to a sibling temp file, then rename over the
    /// target, so a reader never observes a partially-written task file.
    fn write_atomic(&self, task: &Task) -> Result<()> {
        let _guard = DirectoryGuard::unprotect(&self.dir)?;
        let final_path = self.task_path(&task.id);
        let tmp_path = self.dir.join(format!(".{}.tmp", task.id));
        std::fs::write(&tmp_path, serde_json::to_string_pretty(task)?)?;
        std::fs::rename(&tmp_path, &final_path)?;
        if task.is_sentinel().unwrap_or(false) {
            set_mode(&final_path, SENTINEL_MODE)?;
        }
        Ok(())
    }

    /// Allocate the next id: max existing id + 1, skipping the Sentinel.
    pub fn next_id(&self) -> Result<String> {
        let max = self
            .read_all()?
            .iter()
            .filter(|t| t.id != SENTINEL_ID)
            .filter_map(|t| t.id.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        Ok(format!("{:0width$}", max + 1, width = TASK_ID_WIDTH))
    }

    pub fn update(&self, id: &str, patch: impl FnOnce(&mut Task)) -> Result<Task> {
        let mut task = self.read(id)?;
        patch(&mut task);
        self.write_atomic(&task)?;
        Ok(task)
    }

    /// Format the subject string: id prefix, optional parent ref, type
    /// emoji, title (spec §4.5 step 5).
    fn format_subject(id: &str, parent_id: Option<&str>, task_type: TaskType, title: &str) -> String {
        let parent_ref = parent_id.map(|p| format!(" [^#{p}]")).unwrap_or_default();
        let emoji = task_type_emoji(task_type);
        if task_type == TaskType::Sentinel {
            format!("\x1b[1;38;5;208m{emoji} {title}{parent_ref}\x1b[0m")
        } else {
            format!("{id}{parent_ref} {emoji} {title}")
        }
    }

    /// Create a new task of `task_type`. For the types in
    /// [`PLAN_REF_REQUIRED`], `plan_ca_ref` must be present and outside
    /// [`FORBIDDEN_PLAN_PREFIX`] (spec §7, §8 invariant 8). Step 3 of §4.5:
    /// ensures the Sentinel exists (emitting its `task_started` event if
    /// this is the call that creates it) before allocating the new id.
    #[allow(clippy::too_many_arguments)]
    pub fn create_task(
        &self,
        log: &EventLog,
        task_type: TaskType,
        title: &str,
        parent_id: Option<&str>,
        plan_ca_ref: Option<&str>,
        breadcrumb: &Breadcrumb,
        created_cycle: u64,
        created_by: &str,
    ) -> Result<Task> {
        if PLAN_REF_REQUIRED.contains(&task_type) {
            validate_plan_ca_ref(plan_ca_ref)?;
        }

        self.ensure_sentinel(log, breadcrumb, created_cycle)?;

        let id = self.next_id()?;
        let metadata = TaskMetadata {
            task_type: Some(task_type),
            creation_breadcrumb: Some(breadcrumb.format()),
            created_cycle: Some(created_cycle),
            created_by: Some(created_by.to_string()),
            parent_id: parent_id.map(str::to_string),
            plan_ca_ref: plan_ca_ref.map(str::to_string),
            ..Default::default()
        };
        let description = metadata.upsert_into("")?;
        let task = Task {
            id: id.clone(),
            subject: Self::format_subject(&id, parent_id, task_type, title),
            description,
            status: TaskStatus::InProgress,
            blocks: Vec::new(),
            blocked_by: Vec::new(),
            active_form: format!("Working on {title}"),
        };
        self.write_atomic(&task)?;
        Ok(task)
    }

    /// Ensure the Sentinel exists; if it has to be created, also emit a
    /// `task_started` event with `source="sentinel_creation"` so the active
    /// tasks projection immediately sees it (spec §4.5 step 3).
    pub fn ensure_sentinel(&self, log: &EventLog, breadcrumb: &Breadcrumb, created_cycle: u64) -> Result<()> {
        if self.read(SENTINEL_ID).is_ok() {
            return Ok(());
        }
        let task = Task {
            id: SENTINEL_ID.to_string(),
            subject: Self::format_subject(SENTINEL_ID, None, TaskType::Sentinel, "Sentinel"),
            description: TaskMetadata {
                task_type: Some(TaskType::Sentinel),
                creation_breadcrumb: Some(breadcrumb.format()),
                created_cycle: Some(created_cycle),
                created_by: Some("system".to_string()),
                ..Default::default()
            }
            .upsert_into("")?,
            status: TaskStatus::InProgress,
            blocks: Vec::new(),
            blocked_by: Vec::new(),
            active_form: "Holding the task directory open".to_string(),
        };
        self.write_atomic(&task)?;
        log.append(
            breadcrumb,
            EventKind::TaskStarted(TaskLifecycleData {
                task_id: SENTINEL_ID.to_string(),
                task_type: "SENTINEL".to_string(),
                source: Some("sentinel_creation".to_string()),
                extra: Default::default(),
            }),
            None,
        );
        Ok(())
    }
}

fn validate_plan_ca_ref(plan_ca_ref: Option<&str>) -> Result<()> {
    let Some(plan_ca_ref) = plan_ca_ref else {
        return Err(Error::ProtectionViolation(
            "plan_ca_ref is required for this task type".to_string(),
        ));
    };
    if plan_ca_ref.contains(FORBIDDEN_PLAN_PREFIX) {
        return Err(Error::ProtectionViolation(format!(
            "plan_ca_ref must not point into {FORBIDDEN_PLAN_PREFIX}"
        )));
    }
    Ok(())
}

fn task_type_emoji(task_type: TaskType) -> &'static str {
    match task_type {
        TaskType::Mission => "🎯",
        TaskType::Experiment => "🧪",
        TaskType::Detour => "🔀",
        TaskType::Phase => "📋",
        TaskType::Bug => "🐛",
        TaskType::Task => "☑️",
        TaskType::DelegPlan => "📦",
        TaskType::Subplan => "📄",
        TaskType::Archive => "🗄",
        TaskType::GhIssue => "🔗",
        TaskType::Sentinel => "🛡",
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, TaskStore, EventLog) {
        let dir = tempdir().unwrap();
        let log = EventLog::new(dir.path().join("events.jsonl"));
        let store = TaskStore::new(dir.path().join("tasks"));
        (dir, store, log)
    }

    #[test]
    fn create_task_rejects_missing_plan_ref_for_mission() {
        let (_dir, store, log) = store();
        let result = store.create_task(
            &log,
            TaskType::Mission,
            "Ship it",
            None,
            None,
            &Breadcrumb::new(1, "s"),
            1,
            "agent",
        );
        assert!(matches!(result, Err(Error::ProtectionViolation(_))));
    }

    #[test]
    fn create_task_rejects_forbidden_plan_prefix() {
        let (_dir, store, log) = store();
        let result = store.create_task(
            &log,
            TaskType::Mission,
            "Ship it",
            None,
            Some(".claude/plans/foo.md"),
            &Breadcrumb::new(1, "s"),
            1,
            "agent",
        );
        assert!(matches!(result, Err(Error::ProtectionViolation(_))));
    }

    #[test]
    fn create_task_allocates_sequential_ids() {
        let (_dir, store, log) = store();
        let a = store
            .create_task(&log, TaskType::Bug, "fix a", None, None, &Breadcrumb::new(1, "s"), 1, "agent")
            .unwrap();
        let b = store
            .create_task(&log, TaskType::Bug, "fix b", None, None, &Breadcrumb::new(1, "s"), 1, "agent")
            .unwrap();
        assert_eq!(a.id, "001");
        assert_eq!(b.id, "002");
    }

    #[test]
    fn create_task_ensures_the_sentinel_exists() {
        let (_dir, store, log) = store();
        store
            .create_task(&log, TaskType::Bug, "fix a", None, None, &Breadcrumb::new(1, "s"), 1, "agent")
            .unwrap();
        assert!(store.read(SENTINEL_ID).is_ok());
        let records = log.read_all().unwrap();
        assert_eq!(records.iter().filter(|r| r.event_name() == "task_started").count(), 1);
    }

    #[test]
    fn ensure_sentinel_creates_once_and_emits_event() {
        let dir = tempdir().unwrap();
        let store = TaskStore::new(dir.path().join("tasks"));
        let log = EventLog::new(dir.path().join("events.jsonl"));
        let breadcrumb = Breadcrumb::new(1, "s");
        store.ensure_sentinel(&log, &breadcrumb, 1).unwrap();
        assert!(store.read(SENTINEL_ID).is_ok());
        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event_name(), "task_started");

        // idempotent: calling again does not duplicate the event
        store.ensure_sentinel(&log, &breadcrumb, 1).unwrap();
        assert_eq!(log.read_all().unwrap().len(), 1);
    }
}
