//! The append-only event log itself (spec §4.1).

use std::collections::{BTreeMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use fs2::FileExt;
use macf_types::{Breadcrumb, EventKind, EventRecord};
use serde::Serialize;

use crate::query::{canonicalize, QueryFilters, SetOp};

/// Reverse scans that look for the newest `state_snapshot` bound their
/// lookback at this many events (spec §4.3 step 1).
pub const SNAPSHOT_SCAN_BOUND: usize = 100;

pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. Never propagates an error to the caller: any
    /// failure is swallowed and reported as `false` (spec §4.1: "the
    /// telemetry layer must never crash the agent").
    pub fn append(&self, breadcrumb: &Breadcrumb, kind: EventKind, hook_input: Option<serde_json::Value>) -> bool {
        self.try_append(breadcrumb, kind, hook_input).is_ok()
    }

    fn try_append(
        &self,
        breadcrumb: &Breadcrumb,
        kind: EventKind,
        hook_input: Option<serde_json::Value>,
    ) -> crate::error::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let is_new = !self.path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.lock_exclusive()?;
        let result = (|| -> crate::error::Result<()> {
            let timestamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs_f64();
            let mut record = EventRecord::new(timestamp, breadcrumb.format(), kind);
            if let Some(hi) = hook_input {
                record = record.with_hook_input(hi);
            }
            let line = serde_json::to_string(&record).map_err(macf_types::Error::from)?;
            writeln!(file, "{line}")?;
            file.flush()?;
            Ok(())
        })();
        FileExt::unlock(&file)?;
        result?;
        if is_new {
            set_owner_rw(&self.path)?;
        }
        Ok(())
    }

    /// All records, forward order, skipping malformed lines.
    pub fn read_all(&self) -> crate::error::Result<Vec<EventRecord>> {
        self.read(None, false)
    }

    /// `limit` caps the number of records returned; `reverse` walks from the
    /// tail. Malformed lines are skipped rather than failing the read (spec
    /// §4.1: "readers... tolerate concurrent appenders").
    pub fn read(&self, limit: Option<usize>, reverse: bool) -> crate::error::Result<Vec<EventRecord>> {
        let Ok(file) = File::open(&self.path) else {
            return Ok(Vec::new());
        };
        let reader = BufReader::new(file);
        let mut records = Vec::new();
        for line in reader.lines() {
            let Ok(line) = line else { continue };
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(record) = serde_json::from_str::<EventRecord>(&line) {
                records.push(record);
            }
        }
        if reverse {
            records.reverse();
        }
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    pub fn query(&self, filters: &QueryFilters) -> crate::error::Result<Vec<EventRecord>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| filters.matches(r))
            .collect())
    }

    /// `union | intersection | subtraction` over the record sets returned by
    /// each subquery, canonicalized by sorted-key JSON, folded left to right
    /// for intersection/subtraction (spec §4.1).
    pub fn set_operation(&self, queries: &[QueryFilters], op: SetOp) -> crate::error::Result<Vec<EventRecord>> {
        if queries.is_empty() {
            return Ok(Vec::new());
        }
        let mut sets: Vec<BTreeMap<String, EventRecord>> = Vec::with_capacity(queries.len());
        for filters in queries {
            let mut set = BTreeMap::new();
            for record in self.query(filters)? {
                set.insert(canonicalize(&record), record);
            }
            sets.push(set);
        }

        let mut iter = sets.into_iter();
        let mut acc = iter.next().unwrap_or_default();
        for next in iter {
            acc = match op {
                SetOp::Union => {
                    let mut merged = acc;
                    merged.extend(next);
                    merged
                }
                SetOp::Intersection => {
                    let keys: HashSet<&String> = next.keys().collect();
                    acc.into_iter().filter(|(k, _)| keys.contains(k)).collect()
                }
                SetOp::Subtraction => {
                    let keys: HashSet<&String> = next.keys().collect();
                    acc.into_iter().filter(|(k, _)| !keys.contains(k)).collect()
                }
            };
        }

        let mut records: Vec<EventRecord> = acc.into_values().collect();
        records.sort_by(|a, b| a.timestamp.partial_cmp(&b.timestamp).unwrap_or(std::cmp::Ordering::Equal));
        Ok(records)
    }

    /// Forward scan, stopping at the first event with timestamp greater
    /// than `timestamp`, overlaying `session_id`/`cycle` whenever a scanned
    /// event carries them (spec §4.1 "slow-field tracking").
    pub fn reconstruct_state_at(&self, timestamp: f64) -> crate::error::Result<ReconstructedState> {
        let mut state = ReconstructedState::default();
        for record in self.read_all()? {
            if record.timestamp > timestamp {
                break;
            }
            if let Some(session_id) = crate::query::record_session_id(&record) {
                state.session_id = Some(session_id);
            }
            if let EventKind::SessionStarted(d) = &record.kind {
                state.cycle = Some(d.cycle);
            }
            if let EventKind::CompactionDetected(d) = &record.kind {
                state.cycle = Some(d.cycle);
            }
        }
        Ok(state)
    }

    /// Full scan producing the structures a `state_snapshot` is built from
    /// (spec §4.1 `tally_all`).
    pub fn tally_all(&self) -> crate::error::Result<Tallies> {
        let mut tallies = Tallies::default();
        for record in self.read_all()? {
            *tallies.event_tallies.entry(record.event_name().to_string()).or_insert(0) += 1;
            tallies.scan_start = Some(tallies.scan_start.map_or(record.timestamp, |s: f64| s.min(record.timestamp)));
            tallies.scan_end = Some(tallies.scan_end.map_or(record.timestamp, |e: f64| e.max(record.timestamp)));
            match &record.kind {
                EventKind::DevDrvEnded(d) => {
                    *tallies.accumulated_durations.entry("dev_drv".to_string()).or_insert(0.0) += d.duration_seconds;
                }
                EventKind::DelegDrvEnded(d) => {
                    *tallies.accumulated_durations.entry("deleg_drv".to_string()).or_insert(0.0) += d.duration_seconds;
                }
                _ => {}
            }
        }
        tallies.unique_event_types = tallies.event_tallies.len();
        Ok(tallies)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReconstructedState {
    pub session_id: Option<String>,
    pub cycle: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Tallies {
    pub event_tallies: BTreeMap<String, u64>,
    pub accumulated_durations: BTreeMap<String, f64>,
    pub scan_start: Option<f64>,
    pub scan_end: Option<f64>,
    pub unique_event_types: usize,
}

#[cfg(unix)]
fn set_owner_rw(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_owner_rw(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SetOp;
    use macf_types::event::{CompactionDetectedData, SessionStartedData};
    use tempfile::tempdir;

    fn log() -> (tempfile::TempDir, EventLog) {
        let dir = tempdir().unwrap();
        let log = EventLog::new(dir.path().join("agent_events_log.jsonl"));
        (dir, log)
    }

    fn breadcrumb() -> Breadcrumb {
        Breadcrumb::new(1, "abcdefgh")
    }

    #[test]
    fn append_then_read_round_trips() {
        let (_dir, log) = log();
        assert!(log.append(
            &breadcrumb(),
            EventKind::SessionStarted(SessionStartedData {
                session_id: "abcdefgh-1234".into(),
                cycle: 1,
                extra: Default::default(),
            }),
            None,
        ));
        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event_name(), "session_started");
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let (_dir, log) = log();
        std::fs::create_dir_all(log.path().parent().unwrap()).unwrap();
        std::fs::write(log.path(), "not json\n{\"timestamp\":1.0,\"breadcrumb\":\"c_1/s_aaaaaaaa/p_none\",\"event\":\"session_started\",\"data\":{\"session_id\":\"a\",\"cycle\":1}}\n").unwrap();
        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn query_filters_by_event_type() {
        let (_dir, log) = log();
        log.append(
            &breadcrumb(),
            EventKind::SessionStarted(SessionStartedData {
                session_id: "a".into(),
                cycle: 1,
                extra: Default::default(),
            }),
            None,
        );
        log.append(
            &breadcrumb(),
            EventKind::CompactionDetected(CompactionDetectedData {
                session_id: "a".into(),
                cycle: 2,
            }),
            None,
        );
        let filters = QueryFilters {
            event_type: Some("compaction_detected".to_string()),
            ..Default::default()
        };
        let records = log.query(&filters).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event_name(), "compaction_detected");
    }

    #[test]
    fn set_operation_intersection() {
        let (_dir, log) = log();
        log.append(
            &breadcrumb(),
            EventKind::SessionStarted(SessionStartedData {
                session_id: "a".into(),
                cycle: 1,
                extra: Default::default(),
            }),
            None,
        );
        let all = QueryFilters::default();
        let same = QueryFilters::default();
        let result = log.set_operation(&[all, same], SetOp::Intersection).unwrap();
        assert_eq!(result.len(), 1);
    }
}
