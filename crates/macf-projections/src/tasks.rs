//! Active-task projections (spec §4.3): one reverse-scans the event log,
//! the other walks the task directory on disk. They agree by construction
//! in steady state, but recovery trusts the filesystem because the
//! Sentinel can exist before its `task_started` event is ever emitted.

use std::collections::BTreeMap;
use std::path::Path;

use macf_eventlog::EventLog;
use macf_types::{EventKind, Manifest, Task, TaskType};

/// Reverse scan with first-event-wins deduplication per task id; an early
/// exit at the first `compaction_detected` (events behind a compaction
/// boundary are not valid evidence of current activity). A task is active
/// iff the first (i.e. newest) lifecycle event encountered for it is
/// `task_started`.
pub fn active_tasks_from_events(log: &EventLog) -> crate::error::Result<BTreeMap<String, TaskType>> {
    let mut seen = std::collections::HashSet::new();
    let mut active = BTreeMap::new();
    for record in log.read(None, true)? {
        if matches!(record.kind, EventKind::CompactionDetected(_)) {
            break;
        }
        let (task_id, task_type, is_started) = match &record.kind {
            EventKind::TaskStarted(d) => (d.task_id.clone(), d.task_type.clone(), true),
            EventKind::TaskCompleted(d) => (d.task_id.clone(), d.task_type.clone(), false),
            EventKind::TaskPaused(d) => (d.task_id.clone(), d.task_type.clone(), false),
            _ => continue,
        };
        if !seen.insert(task_id.clone()) {
            continue;
        }
        if is_started {
            if let Ok(parsed) = serde_json::from_value::<TaskType>(serde_json::Value::String(task_type)) {
                active.insert(task_id, parsed);
            }
        }
    }
    Ok(active)
}

/// Scan `{tasks_root}/{session_id}/*.json`, keeping tasks whose status is
/// `in_progress` (the on-disk analogue of "last lifecycle event is
/// task_started").
pub fn active_tasks_from_filesystem(session_tasks_dir: &Path) -> crate::error::Result<BTreeMap<String, TaskType>> {
    let mut active = BTreeMap::new();
    let entries = match std::fs::read_dir(session_tasks_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(active),
        Err(err) => return Err(err.into()),
    };
    for entry in entries {
        let entry = entry?;
        if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let contents = std::fs::read_to_string(entry.path())?;
        let Ok(task) = serde_json::from_str::<Task>(&contents) else {
            continue;
        };
        if task.status != macf_types::TaskStatus::InProgress {
            continue;
        }
        if let Some(task_type) = task.task_type()? {
            if task_type != TaskType::Sentinel {
                active.insert(task.id.clone(), task_type);
            }
        }
    }
    Ok(active)
}

/// The union of `task_type_policies` entries for every active task type.
pub fn expected_policies_for_active_tasks(
    active: &BTreeMap<String, TaskType>,
    manifest: &Manifest,
) -> std::collections::BTreeSet<String> {
    let mut expected = std::collections::BTreeSet::new();
    let mut seen_types = std::collections::HashSet::new();
    for task_type in active.values() {
        if seen_types.insert(*task_type) {
            expected.extend(manifest.policies_for_task_type(*task_type));
        }
    }
    expected
}

#[cfg(test)]
mod tests {
    use super::*;
    use macf_types::event::TaskLifecycleData;
    use macf_types::Breadcrumb;
    use tempfile::tempdir;

    #[test]
    fn active_tasks_from_events_keeps_only_started() {
        let dir = tempdir().unwrap();
        let log = EventLog::new(dir.path().join("e.jsonl"));
        log.append(
            &Breadcrumb::new(1, "s"),
            EventKind::TaskStarted(TaskLifecycleData {
                task_id: "001".into(),
                task_type: "BUG".into(),
                source: None,
                extra: Default::default(),
            }),
            None,
        );
        log.append(
            &Breadcrumb::new(1, "s"),
            EventKind::TaskCompleted(TaskLifecycleData {
                task_id: "002".into(),
                task_type: "BUG".into(),
                source: None,
                extra: Default::default(),
            }),
            None,
        );
        let active = active_tasks_from_events(&log).unwrap();
        assert!(active.contains_key("001"));
        assert!(!active.contains_key("002"));
    }

    #[test]
    fn active_tasks_from_events_stops_at_compaction() {
        let dir = tempdir().unwrap();
        let log = EventLog::new(dir.path().join("e.jsonl"));
        log.append(
            &Breadcrumb::new(1, "s"),
            EventKind::TaskStarted(TaskLifecycleData {
                task_id: "001".into(),
                task_type: "BUG".into(),
                source: None,
                extra: Default::default(),
            }),
            None,
        );
        log.append(
            &Breadcrumb::new(2, "s"),
            EventKind::CompactionDetected(macf_types::event::CompactionDetectedData {
                session_id: "s".into(),
                cycle: 2,
            }),
            None,
        );
        log.append(
            &Breadcrumb::new(2, "s"),
            EventKind::TaskStarted(TaskLifecycleData {
                task_id: "003".into(),
                task_type: "BUG".into(),
                source: None,
                extra: Default::default(),
            }),
            None,
        );
        let active = active_tasks_from_events(&log).unwrap();
        assert!(active.contains_key("003"));
        assert!(!active.contains_key("001"));
    }

    #[test]
    fn active_tasks_from_filesystem_skips_missing_dir() {
        let dir = tempdir().unwrap();
        let active = active_tasks_from_filesystem(&dir.path().join("nonexistent")).unwrap();
        assert!(active.is_empty());
    }
}
