//! Grants: the protection escape hatch for mutating CLI operations that
//! would otherwise be rejected outright (spec §4.5, §7).

use std::collections::BTreeSet;

use macf_eventlog::EventLog;
use macf_types::event::{GrantClearedData, GrantData};
use macf_types::{Breadcrumb, EventKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOp {
    Update,
    Delete,
    Create,
}

impl GrantOp {
    fn event_name(self) -> &'static str {
        match self {
            GrantOp::Update => "task_grant_update",
            GrantOp::Delete => "task_grant_delete",
            GrantOp::Create => "task_grant_create",
        }
    }

    fn cleared_event_name(self) -> &'static str {
        match self {
            GrantOp::Update => "task_grant_update_cleared",
            GrantOp::Delete => "task_grant_delete_cleared",
            GrantOp::Create => "task_grant_create_cleared",
        }
    }

    fn as_str(self) -> &'static str {
        self.event_name()
    }
}

/// Look for the newest `task_grant_{op}` whose `task_ids` set equals
/// `task_ids` exactly, not yet superseded by a `_cleared` event for the
/// same set. Reverse scan: the first matching grant or clear wins.
pub fn check_grant_in_events(
    log: &EventLog,
    op: GrantOp,
    task_ids: &BTreeSet<String>,
    field: Option<&str>,
    value: Option<&serde_json::Value>,
) -> bool {
    let Ok(records) = log.read(None, true) else { return false };
    for record in records {
        match &record.kind {
            EventKind::TaskGrantUpdate(d) | EventKind::TaskGrantDelete(d) | EventKind::TaskGrantCreate(d)
                if d.op == op.as_str() =>
            {
                let grant_set: BTreeSet<String> = d.task_ids.iter().cloned().collect();
                if &grant_set != task_ids {
                    continue;
                }
                if field.is_some() && d.field.as_deref() != field {
                    continue;
                }
                if value.is_some() && d.value.as_ref() != value {
                    continue;
                }
                return true;
            }
            EventKind::TaskGrantUpdateCleared(d)
            | EventKind::TaskGrantDeleteCleared(d)
            | EventKind::TaskGrantCreateCleared(d)
                if d.op == op.as_str() =>
            {
                let cleared_set: BTreeSet<String> = d.task_ids.iter().cloned().collect();
                if &cleared_set == task_ids {
                    return false;
                }
            }
            _ => {}
        }
    }
    false
}

fn grant_data(op: GrantOp, task_ids: &BTreeSet<String>) -> GrantData {
    GrantData {
        op: op.as_str().to_string(),
        task_ids: task_ids.iter().cloned().collect(),
        field: None,
        value: None,
    }
}

/// On a matched grant, the operation proceeds and a `_cleared` event is
/// emitted so the grant cannot be reused (spec §4.5).
pub fn emit_grant_cleared(log: &EventLog, breadcrumb: &Breadcrumb, op: GrantOp, task_ids: &BTreeSet<String>) -> bool {
    let cleared = GrantClearedData {
        op: op.as_str().to_string(),
        task_ids: task_ids.iter().cloned().collect(),
    };
    let kind = match op {
        GrantOp::Update => EventKind::TaskGrantUpdateCleared(cleared),
        GrantOp::Delete => EventKind::TaskGrantDeleteCleared(cleared),
        GrantOp::Create => EventKind::TaskGrantCreateCleared(cleared),
    };
    log.append(breadcrumb, kind, None)
}

pub fn emit_grant(log: &EventLog, breadcrumb: &Breadcrumb, op: GrantOp, task_ids: &BTreeSet<String>) -> bool {
    let kind = match op {
        GrantOp::Update => EventKind::TaskGrantUpdate(grant_data(op, task_ids)),
        GrantOp::Delete => EventKind::TaskGrantDelete(grant_data(op, task_ids)),
        GrantOp::Create => EventKind::TaskGrantCreate(grant_data(op, task_ids)),
    };
    log.append(breadcrumb, kind, None)
}

/// `cleared_event_name` is only used indirectly via `EventKind`'s own name()
/// today; kept for CLI `events show` filtering by name string.
pub fn cleared_event_name(op: GrantOp) -> &'static str {
    op.cleared_event_name()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn grant_matches_exact_set_and_clear_invalidates_it() {
        let dir = tempdir().unwrap();
        let log = EventLog::new(dir.path().join("e.jsonl"));
        let breadcrumb = Breadcrumb::new(1, "s");
        let ids: BTreeSet<String> = ["001".to_string(), "002".to_string()].into_iter().collect();

        assert!(!check_grant_in_events(&log, GrantOp::Delete, &ids, None, None));
        emit_grant(&log, &breadcrumb, GrantOp::Delete, &ids);
        assert!(check_grant_in_events(&log, GrantOp::Delete, &ids, None, None));

        emit_grant_cleared(&log, &breadcrumb, GrantOp::Delete, &ids);
        assert!(!check_grant_in_events(&log, GrantOp::Delete, &ids, None, None));
    }

    #[test]
    fn grant_does_not_match_a_different_set() {
        let dir = tempdir().unwrap();
        let log = EventLog::new(dir.path().join("e.jsonl"));
        let breadcrumb = Breadcrumb::new(1, "s");
        let ids: BTreeSet<String> = ["001".to_string()].into_iter().collect();
        let other: BTreeSet<String> = ["001".to_string(), "002".to_string()].into_iter().collect();
        emit_grant(&log, &breadcrumb, GrantOp::Delete, &ids);
        assert!(!check_grant_in_events(&log, GrantOp::Delete, &other, None, None));
    }
}
