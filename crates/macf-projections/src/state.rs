//! Core state projections (spec §4.3).

use macf_eventlog::EventLog;
use macf_types::{Breadcrumb, EventKind};

use crate::snapshot_scan::scan_since_snapshot;

fn session_scope_matches(record_breadcrumb: &str, session_id: Option<&str>) -> bool {
    let Some(session_id) = session_id else { return true };
    let prefix = &session_id[..session_id.len().min(8)];
    Breadcrumb::parse(record_breadcrumb)
        .map(|b| b.session_id == prefix)
        .unwrap_or(false)
}

/// Newest `session_started.data.cycle`, default 0.
pub fn cycle_number(log: &EventLog) -> crate::error::Result<u64> {
    for record in log.read(None, true)? {
        if let EventKind::SessionStarted(d) = &record.kind {
            return Ok(d.cycle);
        }
        if let EventKind::CompactionDetected(d) = &record.kind {
            return Ok(d.cycle);
        }
    }
    Ok(0)
}

/// Count of `compaction_detected`, snapshot-baselined and session-scoped.
pub fn compaction_count(log: &EventLog, session_id: Option<&str>) -> crate::error::Result<u64> {
    let (baseline, events) = scan_since_snapshot(log)?;
    let mut count = baseline
        .as_ref()
        .and_then(|b| b.event_tallies.get("compaction_detected"))
        .copied()
        .unwrap_or(0);
    for record in &events {
        if matches!(record.kind, EventKind::CompactionDetected(_))
            && session_scope_matches(&record.breadcrumb, session_id)
        {
            count += 1;
        }
    }
    Ok(count)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DevDrvStats {
    pub count: u64,
    pub total_duration: f64,
    pub current_prompt_uuid: Option<String>,
    pub from_snapshot: bool,
}

/// Pairs `dev_drv_started`/`dev_drv_ended` by `prompt_uuid`; an unpaired
/// `started` (no matching `ended` yet scanned) becomes `current_prompt_uuid`.
pub fn dev_drv_stats(log: &EventLog, session_id: Option<&str>) -> crate::error::Result<DevDrvStats> {
    let (baseline, events) = scan_since_snapshot(log)?;
    let mut stats = DevDrvStats {
        count: baseline
            .as_ref()
            .and_then(|b| b.event_tallies.get("dev_drv_ended"))
            .copied()
            .unwrap_or(0),
        total_duration: baseline
            .as_ref()
            .and_then(|b| b.accumulated_durations.get("dev_drv"))
            .copied()
            .unwrap_or(0.0),
        current_prompt_uuid: None,
        from_snapshot: baseline.is_some(),
    };

    let mut ended_prompt_uuids = std::collections::HashSet::new();
    for record in &events {
        if !session_scope_matches(&record.breadcrumb, session_id) {
            continue;
        }
        match &record.kind {
            EventKind::DevDrvEnded(d) => {
                stats.count += 1;
                stats.total_duration += d.duration_seconds;
                ended_prompt_uuids.insert(d.prompt_uuid.clone());
            }
            EventKind::DevDrvStarted(d) => {
                if !ended_prompt_uuids.contains(&d.prompt_uuid) && stats.current_prompt_uuid.is_none() {
                    stats.current_prompt_uuid = Some(d.prompt_uuid.clone());
                }
            }
            _ => {}
        }
    }
    Ok(stats)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DelegDrvStats {
    /// one entry per started/ended pair, multiset (no dedup by type)
    pub subagent_types: Vec<String>,
    pub total_duration: f64,
}

pub fn deleg_drv_stats(log: &EventLog, session_id: Option<&str>) -> crate::error::Result<DelegDrvStats> {
    let (baseline, events) = scan_since_snapshot(log)?;
    let mut stats = DelegDrvStats {
        subagent_types: Vec::new(),
        total_duration: baseline
            .as_ref()
            .and_then(|b| b.accumulated_durations.get("deleg_drv"))
            .copied()
            .unwrap_or(0.0),
    };
    for record in events.iter().rev() {
        if !session_scope_matches(&record.breadcrumb, session_id) {
            continue;
        }
        if let EventKind::DelegDrvEnded(d) = &record.kind {
            stats.subagent_types.push(d.subagent_type.clone());
            stats.total_duration += d.duration_seconds;
        }
    }
    Ok(stats)
}

/// Timestamp of the most recent unmatched `delegation_started` for
/// `subagent_type` in this session. `subagent_stop`'s host payload carries
/// no timing data, so duration is derived by pairing against this.
pub fn pending_delegation_started_at(
    log: &EventLog,
    session_id: Option<&str>,
    subagent_type: &str,
) -> crate::error::Result<Option<f64>> {
    let mut completed_seen = 0usize;
    for record in log.read(None, true)? {
        if !session_scope_matches(&record.breadcrumb, session_id) {
            continue;
        }
        match &record.kind {
            EventKind::DelegationCompleted(d) if d.subagent_type == subagent_type => {
                completed_seen += 1;
            }
            EventKind::DelegationStarted(d) if d.subagent_type == subagent_type => {
                if completed_seen == 0 {
                    return Ok(Some(record.timestamp));
                }
                completed_seen -= 1;
            }
            _ => {}
        }
    }
    Ok(None)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delegation {
    pub subagent_type: String,
    pub completed: bool,
}

/// Forward scan, resetting the running list every time a new
/// `dev_drv_started` is seen.
pub fn delegations_this_drive(log: &EventLog, session_id: Option<&str>) -> crate::error::Result<Vec<Delegation>> {
    let mut current = Vec::new();
    for record in log.read_all()? {
        if !session_scope_matches(&record.breadcrumb, session_id) {
            continue;
        }
        match &record.kind {
            EventKind::DevDrvStarted(_) => current.clear(),
            EventKind::DelegationStarted(d) => current.push(Delegation {
                subagent_type: d.subagent_type.clone(),
                completed: false,
            }),
            EventKind::DelegationCompleted(d) => {
                if let Some(entry) = current
                    .iter_mut()
                    .rev()
                    .find(|e: &&mut Delegation| e.subagent_type == d.subagent_type && !e.completed)
                {
                    entry.completed = true;
                } else {
                    current.push(Delegation {
                        subagent_type: d.subagent_type.clone(),
                        completed: true,
                    });
                }
            }
            _ => {}
        }
    }
    Ok(current)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AutoModeSource {
    Default,
    Session,
    Config,
    EnvVar,
}

impl AutoModeSource {
    fn priority(self) -> u8 {
        match self {
            AutoModeSource::Default => 0,
            AutoModeSource::Session => 1,
            AutoModeSource::Config => 2,
            AutoModeSource::EnvVar => 3,
        }
    }

    fn parse(s: &str) -> AutoModeSource {
        match s {
            "env_var" => AutoModeSource::EnvVar,
            "config" => AutoModeSource::Config,
            "session" => AutoModeSource::Session,
            _ => AutoModeSource::Default,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AutoMode {
    pub enabled: bool,
    pub source: AutoModeSource,
    pub confidence: f64,
}

impl Default for AutoMode {
    fn default() -> Self {
        AutoMode {
            enabled: false,
            source: AutoModeSource::Default,
            confidence: 0.0,
        }
    }
}

/// Most recent `auto_mode_detected`, ties broken by source priority
/// `env_var(3) > config(2) > session(1) > default(0)`.
pub fn auto_mode(log: &EventLog, session_id: Option<&str>) -> crate::error::Result<AutoMode> {
    let mut best: Option<(f64, AutoModeSource, AutoMode)> = None;
    for record in log.read_all()? {
        if !session_scope_matches(&record.breadcrumb, session_id) {
            continue;
        }
        if let EventKind::AutoModeDetected(d) = &record.kind {
            let source = AutoModeSource::parse(&d.source);
            let candidate = (
                record.timestamp,
                source,
                AutoMode {
                    enabled: d.enabled,
                    source,
                    confidence: d.confidence,
                },
            );
            best = Some(match best {
                None => candidate,
                Some(current) => {
                    if candidate.0 > current.0
                        || (candidate.0 == current.0 && candidate.1.priority() > current.1.priority())
                    {
                        candidate
                    } else {
                        current
                    }
                }
            });
        }
    }
    Ok(best.map(|(_, _, mode)| mode).unwrap_or_default())
}

/// Newest `migration_detected.data.previous_session`.
pub fn last_session_id_from_events(log: &EventLog) -> crate::error::Result<Option<String>> {
    for record in log.read(None, true)? {
        if let EventKind::MigrationDetected(d) = &record.kind {
            return Ok(Some(d.previous_session.clone()));
        }
    }
    Ok(None)
}

/// Newest `session_ended.data.timestamp`.
pub fn last_session_end_time(log: &EventLog) -> crate::error::Result<Option<f64>> {
    for record in log.read(None, true)? {
        if let EventKind::SessionEnded(d) = &record.kind {
            return Ok(Some(d.timestamp));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use macf_types::event::{AutoModeDetectedData, SessionStartedData};
    use tempfile::tempdir;

    #[test]
    fn cycle_number_defaults_to_zero() {
        let dir = tempdir().unwrap();
        let log = EventLog::new(dir.path().join("e.jsonl"));
        assert_eq!(cycle_number(&log).unwrap(), 0);
    }

    #[test]
    fn cycle_number_reads_newest_session_started() {
        let dir = tempdir().unwrap();
        let log = EventLog::new(dir.path().join("e.jsonl"));
        log.append(
            &Breadcrumb::new(1, "s"),
            EventKind::SessionStarted(SessionStartedData {
                session_id: "s".into(),
                cycle: 5,
                extra: Default::default(),
            }),
            None,
        );
        assert_eq!(cycle_number(&log).unwrap(), 5);
    }

    #[test]
    fn auto_mode_prefers_env_var_on_timestamp_tie() {
        let dir = tempdir().unwrap();
        let log = EventLog::new(dir.path().join("e.jsonl"));
        log.append(
            &Breadcrumb::new(1, "s"),
            EventKind::AutoModeDetected(AutoModeDetectedData {
                enabled: true,
                source: "session".into(),
                confidence: 0.5,
            }),
            None,
        );
        log.append(
            &Breadcrumb::new(1, "s"),
            EventKind::AutoModeDetected(AutoModeDetectedData {
                enabled: false,
                source: "env_var".into(),
                confidence: 0.9,
            }),
            None,
        );
        let mode = auto_mode(&log, None).unwrap();
        assert_eq!(mode.source, AutoModeSource::EnvVar);
    }
}
