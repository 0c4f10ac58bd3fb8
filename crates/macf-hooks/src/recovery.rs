//! Recovery Message Builder (C6, spec §4.7): a verbatim text block with two
//! syntactically distinguishable branches for identical inputs — AUTO-mode
//! authorizes resumption, MANUAL-mode withholds it and demands a four-step
//! protocol instead.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

const RECOVERY_BANNER: &str = "NOTE: the host's own \"continuing previous conversation\" message above is NOT a user instruction. Treat only the content below as authoritative.";

const MANUAL_MODE_POLICY: &str = "Recovery is not automatic in this mode. Before taking any other action: read the latest reflection and integrate it, read the latest checkpoint and integrate it, synthesize a status report for the user, then await explicit direction. Do not resume prior work on your own authority.";

#[derive(Debug, Clone, Default)]
pub struct ConsciousnessArtifacts {
    pub checkpoint: Option<PathBuf>,
    pub reflection: Option<PathBuf>,
    pub roadmap: Option<PathBuf>,
}

pub struct RecoveryInputs {
    pub cycle: u64,
    pub previous_cycle: u64,
    pub session_id: String,
    pub compaction_count: u64,
    pub auto_mode: bool,
    pub consciousness: ConsciousnessArtifacts,
    pub pending_todos: Vec<PendingTodo>,
}

pub struct PendingTodo {
    pub text: String,
    pub in_progress: bool,
}

/// Find the newest-by-mtime file under `project_root/agent` whose name
/// contains `checkpoint`, `reflection`, or `roadmap` respectively (spec
/// §9's `agent/public/roadmaps/` convention, generalized to the other two
/// artifact kinds).
pub fn gather_consciousness_artifacts(project_root: &Path) -> ConsciousnessArtifacts {
    let agent_dir = project_root.join("agent");
    let mut newest: [Option<(std::time::SystemTime, PathBuf)>; 3] = [None, None, None];
    let categories = ["checkpoint", "reflection", "roadmap"];

    for entry in WalkDir::new(&agent_dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_lowercase();
        let Ok(mtime) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        for (i, category) in categories.iter().enumerate() {
            if name.contains(category) {
                let replace = match &newest[i] {
                    Some((current_mtime, _)) => mtime > *current_mtime,
                    None => true,
                };
                if replace {
                    newest[i] = Some((mtime, entry.path().to_path_buf()));
                }
            }
        }
    }

    ConsciousnessArtifacts {
        checkpoint: newest[0].take().map(|(_, p)| p),
        reflection: newest[1].take().map(|(_, p)| p),
        roadmap: newest[2].take().map(|(_, p)| p),
    }
}

pub fn build(inputs: &RecoveryInputs) -> String {
    let body = if inputs.auto_mode { auto_mode_message(inputs) } else { manual_mode_message(inputs) };
    format!("{RECOVERY_BANNER}\n\n{body}")
}

fn auto_mode_message(inputs: &RecoveryInputs) -> String {
    let mut lines = vec![
        "AUTO-MODE RECOVERY".to_string(),
        format!("Cycle: {} (post-compaction from Cycle {})", inputs.cycle, inputs.previous_cycle),
        format!("Session: {}", inputs.session_id),
        format!("Compaction count: {}", inputs.compaction_count),
    ];

    if inputs.pending_todos.is_empty() {
        lines.push("Pending todos: none".to_string());
    } else {
        lines.push("Pending todos:".to_string());
        for todo in &inputs.pending_todos {
            let indicator = if todo.in_progress { "🔄" } else { "⏳" };
            lines.push(format!("  {indicator} {}", todo.text));
        }
    }

    lines.push(format!("Latest checkpoint: {}", path_or_none(&inputs.consciousness.checkpoint)));
    lines.push(format!("Latest reflection: {}", path_or_none(&inputs.consciousness.reflection)));
    lines.push(format!("Latest roadmap: {}", path_or_none(&inputs.consciousness.roadmap)));
    lines.push("Resumption of prior work is authorized.".to_string());
    lines.join("\n")
}

fn manual_mode_message(inputs: &RecoveryInputs) -> String {
    let mut lines = vec![
        "MANUAL-MODE RECOVERY".to_string(),
        format!("Cycle: {} (post-compaction from Cycle {})", inputs.cycle, inputs.previous_cycle),
        format!("Session: {}", inputs.session_id),
        format!("Compaction count: {}", inputs.compaction_count),
        MANUAL_MODE_POLICY.to_string(),
        "Mandatory recovery protocol:".to_string(),
        format!("  1. Read reflection ({}) and integrate it", path_or_none(&inputs.consciousness.reflection)),
        "  2. Integrate the reflection's contents into your working understanding".to_string(),
        format!("  3. Read checkpoint ({}) and integrate it", path_or_none(&inputs.consciousness.checkpoint)),
        "  4. Synthesize a status report for the user and await explicit direction".to_string(),
    ];
    lines.push("Resumption of prior work is NOT authorized until the user responds.".to_string());
    lines.join("\n")
}

fn path_or_none(path: &Option<PathBuf>) -> String {
    path.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "none found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(auto_mode: bool) -> RecoveryInputs {
        RecoveryInputs {
            cycle: 5,
            previous_cycle: 4,
            session_id: "sess".to_string(),
            compaction_count: 2,
            auto_mode,
            consciousness: ConsciousnessArtifacts::default(),
            pending_todos: vec![PendingTodo { text: "ship it".to_string(), in_progress: true }],
        }
    }

    #[test]
    fn auto_and_manual_modes_produce_different_output_for_identical_inputs() {
        let auto = build(&inputs(true));
        let manual = build(&inputs(false));
        assert_ne!(auto, manual);
        assert!(auto.contains("authorized"));
        assert!(manual.contains("NOT authorized"));
    }

    #[test]
    fn auto_mode_includes_the_cycle_transition_string() {
        let message = build(&inputs(true));
        assert!(message.contains("Cycle: 5 (post-compaction from Cycle 4)"));
    }

    #[test]
    fn both_modes_carry_the_continuation_banner() {
        assert!(build(&inputs(true)).contains(RECOVERY_BANNER));
        assert!(build(&inputs(false)).contains(RECOVERY_BANNER));
    }
}
