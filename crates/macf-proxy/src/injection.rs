//! Injection-state tracker (spec §4.10 step 2): watches which policy names
//! are present as `<macf-policy-injection>` blocks in main-conversation
//! requests and reports the startup expectation vs reality, then additions
//! and removals relative to the previous request. Compares sets, not
//! order, so out-of-order sub-hook calls never perturb it (spec §5).

use std::collections::BTreeSet;
use std::sync::Mutex;

use regex::Regex;
use std::sync::LazyLock;

static INJECTION_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<macf-policy-injection\s+policy="([^"]+)">"#).unwrap());

/// Policy names named by injection blocks in the content of user-role
/// messages. `content` may be a plain string or a list of typed blocks;
/// both are scanned textually.
pub fn scan_injected_policies(messages: &serde_json::Value) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    let Some(messages) = messages.as_array() else { return found };
    for message in messages {
        if message.get("role").and_then(serde_json::Value::as_str) != Some("user") {
            continue;
        }
        for text in message_texts(message.get("content")) {
            for cap in INJECTION_BLOCK.captures_iter(&text) {
                found.insert(cap[1].to_string());
            }
        }
    }
    found
}

fn message_texts(content: Option<&serde_json::Value>) -> Vec<String> {
    match content {
        Some(serde_json::Value::String(s)) => vec![s.clone()],
        Some(serde_json::Value::Array(blocks)) => blocks
            .iter()
            .filter_map(|b| b.get("text").and_then(serde_json::Value::as_str))
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind")]
pub enum InjectionReport {
    Startup { expected: BTreeSet<String>, actual: BTreeSet<String> },
    Changed { added: BTreeSet<String>, removed: BTreeSet<String> },
    Unchanged,
}

pub struct InjectionTracker {
    expected_at_startup: BTreeSet<String>,
    previous_actual: Mutex<Option<BTreeSet<String>>>,
}

impl InjectionTracker {
    pub fn new(expected_at_startup: BTreeSet<String>) -> Self {
        Self { expected_at_startup, previous_actual: Mutex::new(None) }
    }

    /// Update the tracker with one main-conversation request's actual set
    /// and return the report to attach to the `api_request` log record.
    pub fn observe(&self, actual: BTreeSet<String>) -> InjectionReport {
        let mut previous = self.previous_actual.lock().unwrap();
        let report = match previous.as_ref() {
            None => InjectionReport::Startup { expected: self.expected_at_startup.clone(), actual: actual.clone() },
            Some(prev) => {
                let added: BTreeSet<String> = actual.difference(prev).cloned().collect();
                let removed: BTreeSet<String> = prev.difference(&actual).cloned().collect();
                if added.is_empty() && removed.is_empty() {
                    InjectionReport::Unchanged
                } else {
                    InjectionReport::Changed { added, removed }
                }
            }
        };
        *previous = Some(actual);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_observation_reports_startup_expected_vs_actual() {
        let tracker = InjectionTracker::new(BTreeSet::from(["a".to_string(), "b".to_string()]));
        let report = tracker.observe(BTreeSet::from(["a".to_string()]));
        assert_eq!(
            report,
            InjectionReport::Startup {
                expected: BTreeSet::from(["a".to_string(), "b".to_string()]),
                actual: BTreeSet::from(["a".to_string()]),
            }
        );
    }

    #[test]
    fn second_observation_reports_additions_and_removals() {
        let tracker = InjectionTracker::new(BTreeSet::new());
        tracker.observe(BTreeSet::from(["a".to_string(), "b".to_string()]));
        let report = tracker.observe(BTreeSet::from(["b".to_string(), "c".to_string()]));
        assert_eq!(
            report,
            InjectionReport::Changed { added: BTreeSet::from(["c".to_string()]), removed: BTreeSet::from(["a".to_string()]) }
        );
    }

    #[test]
    fn identical_sets_report_unchanged_regardless_of_order() {
        let tracker = InjectionTracker::new(BTreeSet::new());
        tracker.observe(BTreeSet::from(["a".to_string(), "b".to_string()]));
        let report = tracker.observe(BTreeSet::from(["b".to_string(), "a".to_string()]));
        assert_eq!(report, InjectionReport::Unchanged);
    }

    #[test]
    fn scans_string_and_block_content_for_injection_policy_names() {
        let messages = json!([
            {"role": "user", "content": "<macf-policy-injection policy=\"P1\">body</macf-policy-injection>"},
            {"role": "assistant", "content": "ignored"},
            {"role": "user", "content": [{"type": "text", "text": "<macf-policy-injection policy=\"P2\">x</macf-policy-injection>"}]},
        ]);
        let found = scan_injected_policies(&messages);
        assert_eq!(found, BTreeSet::from(["P1".to_string(), "P2".to_string()]));
    }
}
