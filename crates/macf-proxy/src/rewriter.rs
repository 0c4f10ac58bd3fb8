//! Message rewriter (spec §4.10 step 3): replaces stale
//! `<macf-policy-injection>` blocks with a self-closing marker before the
//! request is forwarded upstream.

use std::collections::{BTreeSet, HashMap};

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static INJECTION_FULL_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<macf-policy-injection\s+policy="([^"]+)">.*?</macf-policy-injection>"#).unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteMode {
    /// Keep the latest occurrence of each policy name, mark the rest.
    Deduplicate,
    /// Mark every occurrence, latest included.
    CleanupAll,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct RewriteReport {
    pub replacements_made: usize,
    pub bytes_saved: i64,
    pub policies_replaced: BTreeSet<String>,
}

struct Occurrence {
    name: String,
    start: usize,
    end: usize,
}

fn marker(name: &str, breadcrumb: &str) -> String {
    format!(r#"<macf-policy-injection name="{name}" replaced_at="{breadcrumb}" />"#)
}

/// Find every full injection block in `text`, in document order.
fn find_occurrences(text: &str) -> Vec<Occurrence> {
    INJECTION_FULL_BLOCK
        .captures_iter(text)
        .map(|cap| {
            let whole = cap.get(0).unwrap();
            Occurrence { name: cap[1].to_string(), start: whole.start(), end: whole.end() }
        })
        .collect()
}

/// A single text-bearing location inside the request body: either a
/// message's plain-string `content`, or one `text` block inside a
/// message's typed `content` array.
enum TextSite {
    MessageString(usize),
    MessageBlock(usize, usize),
}

/// Every text site in the body, in document order (message order, then
/// block order within a message's content array).
fn collect_sites(body: &Value) -> Vec<TextSite> {
    let mut sites = Vec::new();
    let Some(messages) = body.get("messages").and_then(Value::as_array) else { return sites };
    for (mi, message) in messages.iter().enumerate() {
        match message.get("content") {
            Some(Value::String(_)) => sites.push(TextSite::MessageString(mi)),
            Some(Value::Array(blocks)) => {
                for (bi, block) in blocks.iter().enumerate() {
                    if matches!(block.get("text"), Some(Value::String(_))) {
                        sites.push(TextSite::MessageBlock(mi, bi));
                    }
                }
            }
            _ => {}
        }
    }
    sites
}

fn get_text<'a>(body: &'a Value, site: &TextSite) -> &'a str {
    match *site {
        TextSite::MessageString(mi) => body["messages"][mi]["content"].as_str().unwrap(),
        TextSite::MessageBlock(mi, bi) => body["messages"][mi]["content"][bi]["text"].as_str().unwrap(),
    }
}

fn set_text(body: &mut Value, site: &TextSite, text: String) {
    match *site {
        TextSite::MessageString(mi) => body["messages"][mi]["content"] = Value::String(text),
        TextSite::MessageBlock(mi, bi) => body["messages"][mi]["content"][bi]["text"] = Value::String(text),
    }
}

/// Rewrite every message's content in place. `breadcrumb` is stamped into
/// each marker's `replaced_at` attribute.
///
/// Deduplication (per spec §4.10 step 3 / invariant S3) is scoped across
/// the whole `messages` array, not per message: a policy name that recurs
/// across several separate messages is still counted and collapsed to its
/// single latest occurrence.
pub fn rewrite(body: &mut Value, mode: RewriteMode, breadcrumb: &str) -> RewriteReport {
    let mut report = RewriteReport::default();
    let sites = collect_sites(body);
    if sites.is_empty() {
        return report;
    }

    let per_site_occurrences: Vec<Vec<Occurrence>> = sites.iter().map(|site| find_occurrences(get_text(body, site))).collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for occs in &per_site_occurrences {
        for occ in occs {
            *counts.entry(occ.name.as_str()).or_insert(0) += 1;
        }
    }

    // Last (site_idx, occ_idx) seen for each name, in document order.
    let mut latest: HashMap<&str, (usize, usize)> = HashMap::new();
    for (site_idx, occs) in per_site_occurrences.iter().enumerate() {
        for (occ_idx, occ) in occs.iter().enumerate() {
            latest.insert(occ.name.as_str(), (site_idx, occ_idx));
        }
    }

    for (site_idx, site) in sites.iter().enumerate() {
        let occs = &per_site_occurrences[site_idx];
        if occs.is_empty() {
            continue;
        }

        let mut to_replace: Vec<&Occurrence> = occs
            .iter()
            .enumerate()
            .filter(|(occ_idx, occ)| {
                let is_latest = latest.get(occ.name.as_str()) == Some(&(site_idx, *occ_idx));
                match mode {
                    RewriteMode::CleanupAll => true,
                    RewriteMode::Deduplicate => !is_latest && counts[occ.name.as_str()] > 1,
                }
            })
            .map(|(_, occ)| occ)
            .collect();
        if to_replace.is_empty() {
            continue;
        }

        // Apply in reverse offset order so earlier replacements don't shift
        // the byte ranges of ones still pending.
        to_replace.sort_by(|a, b| b.start.cmp(&a.start));

        let mut text = get_text(body, site).to_string();
        for occ in to_replace {
            let replacement = marker(&occ.name, breadcrumb);
            report.bytes_saved += (occ.end - occ.start) as i64 - replacement.len() as i64;
            report.replacements_made += 1;
            report.policies_replaced.insert(occ.name.clone());
            text.replace_range(occ.start..occ.end, &replacement);
        }
        set_text(body, site, text);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn idempotent_when_no_injection_blocks_are_present() {
        let mut body = json!({"messages": [{"role": "user", "content": "hello"}]});
        let original = body.clone();
        let report = rewrite(&mut body, RewriteMode::Deduplicate, "c1:sess:u1");
        assert_eq!(report.replacements_made, 0);
        assert_eq!(report.bytes_saved, 0);
        assert_eq!(body, original);
    }

    #[test]
    fn deduplicate_keeps_only_the_latest_occurrence() {
        let block = |n: &str| format!(r#"<macf-policy-injection policy="{n}">body</macf-policy-injection>"#);
        let mut body = json!({
            "messages": [
                {"role": "user", "content": format!("before {} middle", block("P"))},
                {"role": "user", "content": format!("after {}", block("P"))},
            ]
        });
        let report = rewrite(&mut body, RewriteMode::Deduplicate, "c1:sess:u1");
        assert_eq!(report.replacements_made, 1);
        assert_eq!(report.policies_replaced, BTreeSet::from(["P".to_string()]));

        let first = body["messages"][0]["content"].as_str().unwrap();
        assert!(first.contains(r#"<macf-policy-injection name="P" replaced_at="c1:sess:u1" />"#));
        let second = body["messages"][1]["content"].as_str().unwrap();
        assert!(second.contains(r#"<macf-policy-injection policy="P">body</macf-policy-injection>"#));
    }

    #[test]
    fn cleanup_all_replaces_every_occurrence_including_the_latest() {
        let block = |n: &str| format!(r#"<macf-policy-injection policy="{n}">body</macf-policy-injection>"#);
        let mut body = json!({"messages": [{"role": "user", "content": block("P")}]});
        let report = rewrite(&mut body, RewriteMode::CleanupAll, "c1:sess:u1");
        assert_eq!(report.replacements_made, 1);
        let content = body["messages"][0]["content"].as_str().unwrap();
        assert!(content.contains(r#"name="P""#));
        assert!(!content.contains("policy=\"P\">body"));
    }

    #[test]
    fn does_not_replace_a_single_occurrence_in_deduplicate_mode() {
        let block = r#"<macf-policy-injection policy="Solo">body</macf-policy-injection>"#;
        let mut body = json!({"messages": [{"role": "user", "content": block}]});
        let report = rewrite(&mut body, RewriteMode::Deduplicate, "c1:sess:u1");
        assert_eq!(report.replacements_made, 0);
        assert_eq!(body["messages"][0]["content"].as_str().unwrap(), block);
    }

    #[test]
    fn rewrites_typed_content_blocks_not_just_plain_strings() {
        let block = |n: &str| format!(r#"<macf-policy-injection policy="{n}">x</macf-policy-injection>"#);
        let mut body = json!({
            "messages": [
                {"role": "user", "content": [{"type": "text", "text": block("P")}]},
                {"role": "user", "content": [{"type": "text", "text": block("P")}]},
            ]
        });
        let report = rewrite(&mut body, RewriteMode::Deduplicate, "c1:sess:u1");
        assert_eq!(report.replacements_made, 1);
    }
}
