//! `cleanup_all` activation (spec §4.10 step 3): switches the rewriter to
//! `cleanup_all` for one forwarded request whenever a `task_completed`
//! event landed in the log since the previous forwarded request.

use std::sync::Mutex;

use macf_eventlog::EventLog;
use macf_types::EventKind;

use crate::rewriter::RewriteMode;

pub struct ModeTracker {
    last_checked: Mutex<f64>,
}

impl ModeTracker {
    pub fn new() -> Self {
        Self { last_checked: Mutex::new(0.0) }
    }

    /// Determine this request's mode and advance the watermark to now.
    pub fn next_mode(&self, log: &EventLog) -> RewriteMode {
        let mut last_checked = self.last_checked.lock().unwrap();
        let records = log.read_all().unwrap_or_default();
        let task_completed_since =
            records.iter().any(|r| r.timestamp > *last_checked && matches!(r.kind, EventKind::TaskCompleted(_)));
        *last_checked = records.last().map(|r| r.timestamp).unwrap_or(*last_checked);
        if task_completed_since {
            RewriteMode::CleanupAll
        } else {
            RewriteMode::Deduplicate
        }
    }
}

impl Default for ModeTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macf_types::event::TaskLifecycleData;
    use macf_types::Breadcrumb;
    use tempfile::tempdir;

    #[test]
    fn defaults_to_deduplicate_with_no_task_completions() {
        let dir = tempdir().unwrap();
        let log = EventLog::new(dir.path().join("events.jsonl"));
        let tracker = ModeTracker::new();
        assert_eq!(tracker.next_mode(&log), RewriteMode::Deduplicate);
    }

    #[test]
    fn switches_to_cleanup_all_after_a_task_completed_event() {
        let dir = tempdir().unwrap();
        let log = EventLog::new(dir.path().join("events.jsonl"));
        let tracker = ModeTracker::new();
        assert_eq!(tracker.next_mode(&log), RewriteMode::Deduplicate);

        let breadcrumb = Breadcrumb::new(1, "sess1234");
        log.append(
            &breadcrumb,
            EventKind::TaskCompleted(TaskLifecycleData { task_id: "t1".to_string(), ..Default::default() }),
            None,
        );
        assert_eq!(tracker.next_mode(&log), RewriteMode::CleanupAll);
        assert_eq!(tracker.next_mode(&log), RewriteMode::Deduplicate);
    }
}
