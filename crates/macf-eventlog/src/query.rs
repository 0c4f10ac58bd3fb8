//! Query filters for `EventLog::query` (spec §4.1).

use macf_types::{Breadcrumb, EventRecord};

/// Sub-filter over a record's parsed breadcrumb. Any component left `None`
/// is unconstrained.
#[derive(Debug, Clone, Default)]
pub struct BreadcrumbFilter {
    pub session_id: Option<String>,
    pub cycle: Option<u64>,
    pub git_hash: Option<String>,
    pub prompt_uuid: Option<String>,
    pub timestamp_min: Option<i64>,
    pub timestamp_max: Option<i64>,
}

impl BreadcrumbFilter {
    fn matches(&self, breadcrumb: &Breadcrumb) -> bool {
        if let Some(s) = &self.session_id {
            if &breadcrumb.session_id != s {
                return false;
            }
        }
        if let Some(c) = self.cycle {
            if breadcrumb.cycle != c {
                return false;
            }
        }
        if let Some(g) = &self.git_hash {
            if breadcrumb.git_hash.as_deref() != Some(g.as_str()) {
                return false;
            }
        }
        if let Some(p) = &self.prompt_uuid {
            if breadcrumb.prompt_uuid.as_deref() != Some(p.as_str()) {
                return false;
            }
        }
        if let Some(min) = self.timestamp_min {
            if breadcrumb.timestamp.is_none_or(|t| t < min) {
                return false;
            }
        }
        if let Some(max) = self.timestamp_max {
            if breadcrumb.timestamp.is_none_or(|t| t > max) {
                return false;
            }
        }
        true
    }
}

/// Conjunctive filter set for a forward scan (spec §4.1 `query`).
#[derive(Debug, Clone, Default)]
pub struct QueryFilters {
    pub event_type: Option<String>,
    pub since: Option<f64>,
    pub until: Option<f64>,
    pub breadcrumb: Option<BreadcrumbFilter>,
    pub session_id: Option<String>,
    pub without_matching: Option<String>,
}

impl QueryFilters {
    pub fn matches(&self, record: &EventRecord) -> bool {
        if let Some(event_type) = &self.event_type {
            if record.event_name() != event_type {
                return false;
            }
        }
        if let Some(without) = &self.without_matching {
            if record.event_name() == without {
                return false;
            }
        }
        if let Some(since) = self.since {
            if !(record.timestamp > since) {
                return false;
            }
        }
        if let Some(until) = self.until {
            if !(record.timestamp < until) {
                return false;
            }
        }
        if let Some(filter) = &self.breadcrumb {
            match Breadcrumb::parse(&record.breadcrumb) {
                Some(b) => {
                    if !filter.matches(&b) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        if let Some(session_id) = &self.session_id {
            if record_session_id(record).as_deref() != Some(session_id.as_str()) {
                return false;
            }
        }
        true
    }
}

/// `data.session_id` lookup, valid only for variants that carry one.
/// Returns `None` for variants without a session_id field (they simply
/// never match a `session_id` filter).
pub fn record_session_id(record: &EventRecord) -> Option<String> {
    use macf_types::EventKind::*;
    match &record.kind {
        SessionStarted(d) => Some(d.session_id.clone()),
        SessionEnded(d) => Some(d.session_id.clone()),
        MigrationDetected(d) => Some(d.session_id.clone()),
        CompactionDetected(d) => Some(d.session_id.clone()),
        ResumeDetected(d) => Some(d.session_id.clone()),
        _ => Breadcrumb::parse(&record.breadcrumb).map(|b| b.session_id),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    Union,
    Intersection,
    Subtraction,
}

/// Canonicalize a record for set-algebra comparison: sorted-key JSON text.
/// Two records that are structurally identical but built with different key
/// insertion order collapse to the same canonical string.
pub fn canonicalize(record: &EventRecord) -> String {
    let value = serde_json::to_value(record).expect("EventRecord always serializes");
    serde_json::to_string(&sort_keys(value)).expect("sorted Value always serializes")
}

fn sort_keys(value: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;
    match value {
        Value::Object(map) => {
            let sorted: std::collections::BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            serde_json::to_value(sorted).unwrap_or(Value::Null)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
