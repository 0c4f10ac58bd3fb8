//! The snapshot-aware reverse-scan pattern every projection in this crate
//! follows (spec §4.3).

use std::collections::BTreeMap;

use macf_eventlog::EventLog;
use macf_types::{EventKind, EventRecord};

pub struct SnapshotBaseline {
    pub timestamp: f64,
    pub event_tallies: BTreeMap<String, u64>,
    pub accumulated_durations: BTreeMap<String, f64>,
}

/// Find the newest `state_snapshot` within the last [`SNAPSHOT_SCAN_BOUND`]
/// events, and the events strictly newer than it (newest first). If no
/// snapshot is found in that window, the baseline is `None` and every event
/// in the log is returned.
///
/// [`SNAPSHOT_SCAN_BOUND`]: macf_eventlog::SNAPSHOT_SCAN_BOUND
pub fn scan_since_snapshot(log: &EventLog) -> crate::error::Result<(Option<SnapshotBaseline>, Vec<EventRecord>)> {
    let all_reverse = log.read(None, true)?;
    let snapshot = all_reverse
        .iter()
        .take(macf_eventlog::SNAPSHOT_SCAN_BOUND)
        .find_map(|r| match &r.kind {
            EventKind::StateSnapshot(data) => Some((r.timestamp, data.clone())),
            _ => None,
        });

    match snapshot {
        Some((timestamp, data)) => {
            let event_tallies = value_map_to_u64(&data.event_tallies);
            let accumulated_durations = value_map_to_f64(&data.accumulated_durations);
            let events_since: Vec<EventRecord> = all_reverse
                .into_iter()
                .take_while(|r| r.timestamp > timestamp)
                .collect();
            Ok((
                Some(SnapshotBaseline {
                    timestamp,
                    event_tallies,
                    accumulated_durations,
                }),
                events_since,
            ))
        }
        None => Ok((None, all_reverse)),
    }
}

fn value_map_to_u64(map: &serde_json::Map<String, serde_json::Value>) -> BTreeMap<String, u64> {
    map.iter()
        .filter_map(|(k, v)| v.as_u64().map(|n| (k.clone(), n)))
        .collect()
}

fn value_map_to_f64(map: &serde_json::Map<String, serde_json::Value>) -> BTreeMap<String, f64> {
    map.iter()
        .filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use macf_types::event::SessionStartedData;
    use macf_types::Breadcrumb;
    use tempfile::tempdir;

    #[test]
    fn no_snapshot_returns_entire_log() {
        let dir = tempdir().unwrap();
        let log = EventLog::new(dir.path().join("events.jsonl"));
        log.append(
            &Breadcrumb::new(1, "s"),
            EventKind::SessionStarted(SessionStartedData {
                session_id: "s".into(),
                cycle: 1,
                extra: Default::default(),
            }),
            None,
        );
        let (baseline, events) = scan_since_snapshot(&log).unwrap();
        assert!(baseline.is_none());
        assert_eq!(events.len(), 1);
    }
}
