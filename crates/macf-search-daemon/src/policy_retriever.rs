//! The default `policy` retriever (spec §4.9): wraps C7's hybrid search.

use anyhow::Result;

use macf_policy::{Database, SearchResult};
use macf_types::Manifest;

use crate::protocol::Response;
use crate::retriever::Retriever;

pub struct PolicyRetriever {
    db: Database,
    manifest: Manifest,
}

impl PolicyRetriever {
    pub fn new(db: Database, manifest: Manifest) -> Self {
        Self { db, manifest }
    }

    fn format(results: &[SearchResult]) -> (String, Vec<String>) {
        let formatted = results
            .iter()
            .map(|r| format!("## {} ({:?})\n", r.policy_name, r.confidence))
            .collect::<String>();
        let explanations = results.iter().flat_map(|r| r.explanations.clone()).collect();
        (formatted, explanations)
    }
}

impl Retriever for PolicyRetriever {
    fn namespace(&self) -> &str {
        "policy"
    }

    fn warmup(&mut self) -> Result<()> {
        // One throwaway query to JIT-compile the search codepath, per spec §4.9.
        let _ = macf_policy::hybrid_search(&self.db, &self.manifest)("warmup query to compile codepaths");
        Ok(())
    }

    fn search(&self, query: &str, limit: usize) -> Result<Response> {
        let start = std::time::Instant::now();
        let mut results = macf_policy::hybrid_search(&self.db, &self.manifest)(query)?;
        results.truncate(limit.min(macf_policy::MAX_RESULTS));
        let (formatted, explanations) = Self::format(&results);
        Ok(Response {
            formatted,
            explanations,
            search_time_ms: start.elapsed().as_millis() as u64,
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macf_types::manifest::PolicyEntry;

    #[test]
    fn warmup_then_search_returns_formatted_results() {
        let manifest = Manifest {
            active_layers: vec!["base".into()],
            policies: vec![PolicyEntry {
                name: "bug-protocol".into(),
                layer: "base".into(),
                languages: vec![],
                consciousness: vec![],
                body: "When should I file a bug report against this service?".into(),
                keywords: vec!["bug".into()],
            }],
            ..Default::default()
        };
        let mut db = Database::open_in_memory().unwrap();
        db.build_index(&manifest).unwrap();
        let mut retriever = PolicyRetriever::new(db, manifest);
        retriever.warmup().unwrap();
        let response = retriever.search("when should I file a bug report", 5).unwrap();
        assert!(response.formatted.contains("bug-protocol"));
    }
}
