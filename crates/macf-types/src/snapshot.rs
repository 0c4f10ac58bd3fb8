//! State snapshot schema (spec §3.5).
//!
//! A snapshot is a frozen accumulation that projections use as a lower
//! bound: once a reverse scan reaches a `state_snapshot` event, it stops
//! and folds the snapshot's counters into whatever it tallied since.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotType {
    Init,
    CompactionRecovery,
    Manual,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub scan_start_timestamp: Option<f64>,
    pub scan_end_timestamp: Option<f64>,
    pub unique_event_types: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub snapshot_type: SnapshotType,
    /// event name -> count, accumulated as of this snapshot
    pub event_tallies: BTreeMap<String, u64>,
    /// drive kind (`dev_drv` / `deleg_drv`) -> accumulated seconds
    pub accumulated_durations: BTreeMap<String, f64>,
    /// derived state values frozen at snapshot time, e.g. `cycle_number`
    pub derived_state: BTreeMap<String, serde_json::Value>,
    pub metadata: SnapshotMetadata,
}

impl StateSnapshot {
    pub fn new(snapshot_type: SnapshotType) -> Self {
        Self {
            snapshot_type,
            event_tallies: BTreeMap::new(),
            accumulated_durations: BTreeMap::new(),
            derived_state: BTreeMap::new(),
            metadata: SnapshotMetadata::default(),
        }
    }

    pub fn tally(&self, event_name: &str) -> u64 {
        self.event_tallies.get(event_name).copied().unwrap_or(0)
    }

    pub fn duration(&self, drive_kind: &str) -> f64 {
        self.accumulated_durations.get(drive_kind).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tallies_default_to_zero() {
        let snapshot = StateSnapshot::new(SnapshotType::Init);
        assert_eq!(snapshot.tally("tool_call_started"), 0);
        assert_eq!(snapshot.duration("dev_drv"), 0.0);
    }

    #[test]
    fn round_trips_through_json() {
        let mut snapshot = StateSnapshot::new(SnapshotType::CompactionRecovery);
        snapshot.event_tallies.insert("tool_call_started".into(), 12);
        snapshot.accumulated_durations.insert("dev_drv".into(), 42.5);
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: StateSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tally("tool_call_started"), 12);
        assert_eq!(back.duration("dev_drv"), 42.5);
    }
}
