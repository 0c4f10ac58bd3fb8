//! Hybrid policy search (spec §4.8): four retrievers — FTS5 over policy
//! bodies, title/keyword match against the manifest's discovery index,
//! question-bank FTS5, and the lexical-vector retriever — fused by
//! reciprocal rank fusion.

use std::collections::BTreeMap;

use anyhow::Result;

use macf_types::Manifest;

use crate::db::Database;
use crate::lexical;

pub const RRF_K: f64 = 60.0;
pub const MIN_QUERY_LEN: usize = 10;
pub const MAX_RESULTS: usize = 5;

pub const CRITICAL_THRESHOLD: f64 = 0.025;
pub const HIGH_THRESHOLD: f64 = 0.015;
pub const MEDIUM_THRESHOLD: f64 = 0.008;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    Medium,
    High,
    Critical,
}

impl Confidence {
    fn from_score(score: f64) -> Option<Self> {
        if score >= CRITICAL_THRESHOLD {
            Some(Confidence::Critical)
        } else if score >= HIGH_THRESHOLD {
            Some(Confidence::High)
        } else if score >= MEDIUM_THRESHOLD {
            Some(Confidence::Medium)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub policy_name: String,
    pub score: f64,
    pub confidence: Confidence,
    /// Which retrievers contributed a rank for this policy, for `--explain`.
    pub explanations: Vec<String>,
}

/// Title/keyword retriever: exact or prefix match of `query` words against
/// `discovery_index` keys, best first.
fn title_keyword_rank(query: &str, manifest: &Manifest) -> Vec<String> {
    let words: Vec<String> = query.to_lowercase().split_whitespace().map(str::to_string).collect();
    let mut hits: BTreeMap<String, usize> = BTreeMap::new();
    for (keyword, policies) in &manifest.discovery_index {
        let keyword_lower = keyword.to_lowercase();
        let matched = words.iter().any(|w| keyword_lower == *w || keyword_lower.starts_with(w.as_str()));
        if matched {
            for policy in policies {
                *hits.entry(policy.clone()).or_insert(0) += 1;
            }
        }
    }
    let mut ranked: Vec<(String, usize)> = hits.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().map(|(name, _)| name).collect()
}

fn rrf_contribution(rank: usize) -> f64 {
    1.0 / (RRF_K + rank as f64 + 1.0)
}

/// Run all four retrievers and fuse their rankings by reciprocal rank
/// fusion. Queries shorter than [`MIN_QUERY_LEN`] return no results (spec
/// §4.8's guard against one- and two-word noise queries).
pub fn hybrid_search(db: &Database, manifest: &Manifest) -> impl Fn(&str) -> Result<Vec<SearchResult>> + '_ {
    move |query: &str| -> Result<Vec<SearchResult>> {
        if query.trim().len() < MIN_QUERY_LEN {
            return Ok(Vec::new());
        }

        let mut scores: BTreeMap<String, f64> = BTreeMap::new();
        let mut explanations: BTreeMap<String, Vec<String>> = BTreeMap::new();

        let mut add = |label: &str, ranking: Vec<String>| {
            for (rank, policy_name) in ranking.into_iter().enumerate() {
                *scores.entry(policy_name.clone()).or_insert(0.0) += rrf_contribution(rank);
                explanations.entry(policy_name).or_default().push(format!("{label}#{rank}"));
            }
        };

        add("fts", db.fts_search(query, MAX_RESULTS.max(20))?);
        add("title", title_keyword_rank(query, manifest));
        add("questions", db.question_search(query, MAX_RESULTS.max(20))?);
        let documents = db.all_documents()?;
        let lexical_ranked: Vec<String> = lexical::rank(query, &documents).into_iter().map(|(name, _)| name).collect();
        add("lexical", lexical_ranked);

        let mut results: Vec<SearchResult> = scores
            .into_iter()
            .filter_map(|(policy_name, score)| {
                Confidence::from_score(score).map(|confidence| SearchResult {
                    explanations: explanations.remove(&policy_name).unwrap_or_default(),
                    policy_name,
                    score,
                    confidence,
                })
            })
            .collect();
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(MAX_RESULTS);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macf_types::manifest::PolicyEntry;
    use std::collections::BTreeMap as Map;

    fn manifest() -> Manifest {
        let mut discovery_index = Map::new();
        discovery_index.insert("bug".to_string(), vec!["bug-protocol".to_string()]);
        Manifest {
            policies: vec![PolicyEntry {
                name: "bug-protocol".into(),
                layer: "base".into(),
                languages: vec![],
                consciousness: vec![],
                body: "When should I file a bug?\nFile one whenever behavior diverges from the documented contract.".into(),
                keywords: vec!["bug".into()],
            }],
            active_layers: vec!["base".into()],
            discovery_index,
            ..Default::default()
        }
    }

    #[test]
    fn short_queries_return_nothing() {
        let manifest = manifest();
        let mut db = Database::open_in_memory().unwrap();
        db.build_index(&manifest).unwrap();
        let search = hybrid_search(&db, &manifest);
        assert!(search("bug").unwrap().is_empty());
    }

    #[test]
    fn a_real_query_surfaces_the_matching_policy() {
        let manifest = manifest();
        let mut db = Database::open_in_memory().unwrap();
        db.build_index(&manifest).unwrap();
        let search = hybrid_search(&db, &manifest);
        let results = search("when should I file a bug report").unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].policy_name, "bug-protocol");
    }
}
