//! Deterministic lexical-vector retriever (spec §4.8): a bag-of-words
//! TF/cosine-similarity ranker. The retrieval pack carries no embedding
//! model, so this stands in for "semantic" search with a reproducible
//! lexical approximation — no network call, no model weights.

use std::collections::BTreeMap;

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(str::to_string)
        .collect()
}

fn term_frequencies(tokens: &[String]) -> BTreeMap<String, f64> {
    let mut tf = BTreeMap::new();
    for token in tokens {
        *tf.entry(token.clone()).or_insert(0.0) += 1.0;
    }
    let total = tokens.len().max(1) as f64;
    for value in tf.values_mut() {
        *value /= total;
    }
    tf
}

fn cosine_similarity(a: &BTreeMap<String, f64>, b: &BTreeMap<String, f64>) -> f64 {
    let dot: f64 = a.iter().map(|(term, weight)| weight * b.get(term).copied().unwrap_or(0.0)).sum();
    let norm_a = a.values().map(|w| w * w).sum::<f64>().sqrt();
    let norm_b = b.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Rank `documents` (name, body) by cosine similarity to `query`'s bag of
/// words, best first, dropping zero-similarity documents entirely.
pub fn rank(query: &str, documents: &[(String, String)]) -> Vec<(String, f64)> {
    let query_tf = term_frequencies(&tokenize(query));
    let mut scored: Vec<(String, f64)> = documents
        .iter()
        .map(|(name, body)| (name.clone(), cosine_similarity(&query_tf, &term_frequencies(&tokenize(body)))))
        .filter(|(_, score)| *score > 0.0)
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_the_closer_document_first() {
        let documents = vec![
            ("a".to_string(), "bug reports and bug triage process".to_string()),
            ("b".to_string(), "deployment pipeline configuration".to_string()),
        ];
        let ranked = rank("how do I triage a bug", &documents);
        assert_eq!(ranked.first().map(|(name, _)| name.as_str()), Some("a"));
    }

    #[test]
    fn unrelated_documents_are_dropped() {
        let documents = vec![("a".to_string(), "xylophone quilting marathon".to_string())];
        let ranked = rank("bug triage", &documents);
        assert!(ranked.is_empty());
    }
}
