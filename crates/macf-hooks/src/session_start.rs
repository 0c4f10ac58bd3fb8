//! `session_start` (spec §4.6): the decision tree dispatching to plain
//! temporal context, resume/migration bookkeeping, or full compaction
//! recovery.

use macf_types::event::{
    AutoModeDetectedData, CompactionDetectedData, MigrationDetectedData, ResumeDetectedData, SessionStartedData,
    TaskLifecycleData,
};
use macf_types::hook::{SessionStartInput, SessionStartSource};
use macf_projections::AutoModeSource;
use macf_types::{Breadcrumb, EventKind, HookOutput, Manifest};

use crate::context::HookContext;
use crate::recovery::{self, RecoveryInputs};

/// A marker the host agent writes into the transcript tail when it
/// auto-compacted the conversation. Scanning for this string (rather than
/// parsing the full transcript schema) is how a plain session start tells
/// "just started" apart from "silently compacted behind our back".
const COMPACT_BOUNDARY_MARKER: &str = "compact_boundary";

pub fn run(input: &SessionStartInput, ctx: &HookContext, manifest: &Manifest) -> HookOutput {
    match input.source {
        SessionStartSource::Compact => compaction_recovery(input, ctx, manifest),
        SessionStartSource::Resume => {
            let cycle = macf_projections::cycle_number(&ctx.log).unwrap_or(0);
            let breadcrumb = Breadcrumb::new(cycle, &input.session_id);
            ctx.emit(&breadcrumb, EventKind::ResumeDetected(ResumeDetectedData { session_id: input.session_id.clone() }));
            HookOutput::allow().with_additional_context(plain_temporal_context(cycle, &input.session_id))
        }
        SessionStartSource::Startup | SessionStartSource::Clear => {
            let cycle = macf_projections::cycle_number(&ctx.log).unwrap_or(0);
            let previous = macf_projections::last_session_id_from_events(&ctx.log).unwrap_or(None);
            let breadcrumb = Breadcrumb::new(cycle, &input.session_id);

            if let Some(previous) = previous.filter(|p| p != &input.session_id) {
                ctx.emit(
                    &breadcrumb,
                    EventKind::MigrationDetected(MigrationDetectedData {
                        session_id: input.session_id.clone(),
                        previous_session: previous,
                    }),
                );
                return HookOutput::allow().with_additional_context(plain_temporal_context(cycle, &input.session_id));
            }

            if transcript_tail_has_compact_boundary(input, ctx) {
                return compaction_recovery(input, ctx, manifest);
            }

            ctx.emit(
                &breadcrumb,
                EventKind::SessionStarted(SessionStartedData {
                    session_id: input.session_id.clone(),
                    cycle,
                    extra: Default::default(),
                }),
            );
            HookOutput::allow().with_additional_context(plain_temporal_context(cycle, &input.session_id))
        }
    }
}

fn transcript_tail_has_compact_boundary(input: &SessionStartInput, _ctx: &HookContext) -> bool {
    let Some(transcript_path) = &input.transcript_path else {
        return false;
    };
    std::fs::read_to_string(transcript_path)
        .map(|contents| contents.lines().rev().take(50).any(|line| line.contains(COMPACT_BOUNDARY_MARKER)))
        .unwrap_or(false)
}

/// Steps 1-6 of the compaction recovery procedure (spec §4.6).
fn compaction_recovery(input: &SessionStartInput, ctx: &HookContext, manifest: &Manifest) -> HookOutput {
    let compaction_count = macf_projections::compaction_count(&ctx.log, Some(&input.session_id)).unwrap_or(0);
    let auto_mode = macf_projections::auto_mode(&ctx.log, Some(&input.session_id)).unwrap_or_default();
    let current_cycle = macf_projections::cycle_number(&ctx.log).unwrap_or(0);
    let new_cycle = current_cycle + 1;
    let breadcrumb = Breadcrumb::new(new_cycle, &input.session_id);

    let tallies = ctx.log.tally_all().unwrap_or_default();
    ctx.emit(
        &breadcrumb,
        EventKind::StateSnapshot(macf_types::event::SnapshotData {
            snapshot_type: "compaction_recovery".to_string(),
            event_tallies: tallies.event_tallies.into_iter().map(|(k, v)| (k, v.into())).collect(),
            accumulated_durations: tallies.accumulated_durations.into_iter().map(|(k, v)| (k, v.into())).collect(),
            metadata: Default::default(),
            extra: Default::default(),
        }),
    );
    ctx.emit(
        &breadcrumb,
        EventKind::CompactionDetected(CompactionDetectedData { session_id: input.session_id.clone(), cycle: new_cycle }),
    );
    ctx.emit(
        &breadcrumb,
        EventKind::AutoModeDetected(AutoModeDetectedData {
            enabled: auto_mode.enabled,
            source: auto_mode_source_wire(auto_mode.source).to_string(),
            confidence: auto_mode.confidence,
        }),
    );

    let tasks_dir = ctx.session_tasks_dir(&input.session_id);
    let active = macf_projections::active_tasks_from_filesystem(&tasks_dir).unwrap_or_default();
    for (task_id, task_type) in &active {
        ctx.emit(
            &breadcrumb,
            EventKind::TaskStarted(TaskLifecycleData {
                task_id: task_id.clone(),
                task_type: serde_json::to_value(task_type)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default(),
                source: Some("compaction_recovery".to_string()),
                extra: Default::default(),
            }),
        );
    }
    let expected_policies = macf_projections::expected_policies_for_active_tasks(&active, manifest);
    for policy_name in &expected_policies {
        ctx.emit(
            &breadcrumb,
            EventKind::PolicyInjectionActivated(macf_types::event::PolicyInjectionData {
                policy_name: policy_name.clone(),
                task_type: None,
            }),
        );
    }

    let consciousness = recovery::gather_consciousness_artifacts(&ctx.project_root);
    let message = recovery::build(&RecoveryInputs {
        cycle: new_cycle,
        previous_cycle: current_cycle,
        session_id: input.session_id.clone(),
        compaction_count: compaction_count + 1,
        auto_mode: auto_mode.enabled,
        consciousness,
        pending_todos: Vec::new(),
    });
    HookOutput::allow().with_additional_context(message)
}

fn auto_mode_source_wire(source: AutoModeSource) -> &'static str {
    match source {
        AutoModeSource::EnvVar => "env_var",
        AutoModeSource::Config => "config",
        AutoModeSource::Session => "session",
        AutoModeSource::Default => "default",
    }
}

fn plain_temporal_context(cycle: u64, session_id: &str) -> String {
    format!(
        "Cycle: {cycle}\nSession: {session_id}\nTimestamp: {}",
        chrono::Utc::now().to_rfc3339()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ctx(dir: &tempfile::TempDir) -> HookContext {
        HookContext::new(dir.path(), dir.path().join("events.jsonl"), false)
    }

    #[test]
    fn fresh_startup_emits_session_started_and_allows() {
        let dir = tempdir().unwrap();
        let ctx = ctx(&dir);
        let manifest = Manifest::default();
        let input = SessionStartInput {
            session_id: "sess1".to_string(),
            source: SessionStartSource::Startup,
            transcript_path: None,
            cwd: None,
        };
        let output = run(&input, &ctx, &manifest);
        assert!(output.continue_);
        let records = ctx.log.read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event_name(), "session_started");
    }

    #[test]
    fn resume_emits_resume_detected_not_session_started() {
        let dir = tempdir().unwrap();
        let ctx = ctx(&dir);
        let manifest = Manifest::default();
        let input = SessionStartInput {
            session_id: "sess1".to_string(),
            source: SessionStartSource::Resume,
            transcript_path: None,
            cwd: None,
        };
        let output = run(&input, &ctx, &manifest);
        assert!(output.continue_);
        let records = ctx.log.read_all().unwrap();
        assert_eq!(records[0].event_name(), "resume_detected");
    }

    #[test]
    fn migration_detected_when_session_id_changes() {
        let dir = tempdir().unwrap();
        let ctx = ctx(&dir);
        let manifest = Manifest::default();
        let first = SessionStartInput {
            session_id: "sess1".to_string(),
            source: SessionStartSource::Startup,
            transcript_path: None,
            cwd: None,
        };
        run(&first, &ctx, &manifest);
        let second = SessionStartInput {
            session_id: "sess2".to_string(),
            source: SessionStartSource::Startup,
            transcript_path: None,
            cwd: None,
        };
        let output = run(&second, &ctx, &manifest);
        assert!(output.continue_);
        let records = ctx.log.read_all().unwrap();
        assert_eq!(records.last().unwrap().event_name(), "migration_detected");
    }
}
