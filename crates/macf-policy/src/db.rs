//! Two logical tables — `documents` (one row per policy) and `questions`
//! (one row per question extracted from a policy's navigation guide) — each
//! backed by a content table plus an FTS5 mirror, schema-on-read like the
//! session index this database's shape was adapted from.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use macf_types::manifest::{Manifest, PolicyEntry};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    pub fn open(path: &std::path::Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("opening policy index at {}", path.display()))?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY,
                name TEXT UNIQUE NOT NULL,
                body TEXT NOT NULL,
                keywords TEXT NOT NULL
            );
            CREATE VIRTUAL TABLE IF NOT EXISTS documents_fts USING fts5(
                name, body, content='documents', content_rowid='id'
            );
            CREATE TABLE IF NOT EXISTS questions (
                id INTEGER PRIMARY KEY,
                policy_name TEXT NOT NULL,
                question TEXT NOT NULL
            );
            CREATE VIRTUAL TABLE IF NOT EXISTS questions_fts USING fts5(
                question, content='questions', content_rowid='id'
            );
            ",
        )?;
        Ok(())
    }

    /// Populate the index from a manifest's visible policies, replacing any
    /// existing content (spec §6 CLI `policy build_index`).
    pub fn build_index(&mut self, manifest: &Manifest) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch("DELETE FROM documents; DELETE FROM documents_fts; DELETE FROM questions; DELETE FROM questions_fts;")?;
        for policy in &manifest.policies {
            tx.execute(
                "INSERT INTO documents (name, body, keywords) VALUES (?1, ?2, ?3)",
                params![policy.name, policy.body, policy.keywords.join(",")],
            )?;
            let rowid = tx.last_insert_rowid();
            tx.execute(
                "INSERT INTO documents_fts (rowid, name, body) VALUES (?1, ?2, ?3)",
                params![rowid, policy.name, policy.body],
            )?;
            for question in extract_questions(policy) {
                tx.execute(
                    "INSERT INTO questions (policy_name, question) VALUES (?1, ?2)",
                    params![policy.name, question],
                )?;
                let qrowid = tx.last_insert_rowid();
                tx.execute(
                    "INSERT INTO questions_fts (rowid, question) VALUES (?1, ?2)",
                    params![qrowid, question],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Documents ranked by FTS5 `bm25()`, best first.
    pub fn fts_search(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT d.name FROM documents_fts f JOIN documents d ON d.id = f.rowid
             WHERE documents_fts MATCH ?1 ORDER BY bm25(documents_fts) LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![sanitize_fts_query(query), limit as i64], |row| row.get::<_, String>(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Policy names ranked by how many of their questions matched, best first.
    pub fn question_search(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT q.policy_name FROM questions_fts f JOIN questions q ON q.id = f.rowid
             WHERE questions_fts MATCH ?1
             GROUP BY q.policy_name ORDER BY MIN(bm25(questions_fts)) LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![sanitize_fts_query(query), limit as i64], |row| row.get::<_, String>(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    pub fn all_documents(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare("SELECT name, body FROM documents")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }
}

/// A policy's "navigation guide" section lines ending in `?` become
/// question-bank entries (spec §4.8: "questions extracted from a policy's
/// structured navigation guide section").
fn extract_questions(policy: &PolicyEntry) -> Vec<String> {
    policy
        .body
        .lines()
        .map(str::trim)
        .filter(|line| line.ends_with('?') && line.len() > 10)
        .map(str::to_string)
        .collect()
}

/// FTS5 MATCH treats `"`, `*` and leading `-` specially; queries here come
/// from free-text user input, so quote the whole thing as a phrase.
fn sanitize_fts_query(query: &str) -> String {
    format!("\"{}\"", query.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use macf_types::manifest::PolicyEntry;

    fn manifest_with_one_policy() -> Manifest {
        Manifest {
            policies: vec![PolicyEntry {
                name: "bug-protocol".into(),
                layer: "base".into(),
                languages: vec![],
                consciousness: vec![],
                body: "When should I file a bug?\nFile one whenever behavior diverges from spec.".into(),
                keywords: vec!["bug".into()],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn build_index_then_fts_search_finds_the_policy() {
        let mut db = Database::open_in_memory().unwrap();
        db.build_index(&manifest_with_one_policy()).unwrap();
        let results = db.fts_search("bug", 5).unwrap();
        assert_eq!(results, vec!["bug-protocol".to_string()]);
    }

    #[test]
    fn question_search_finds_extracted_questions() {
        let mut db = Database::open_in_memory().unwrap();
        db.build_index(&manifest_with_one_policy()).unwrap();
        let results = db.question_search("bug", 5).unwrap();
        assert_eq!(results, vec!["bug-protocol".to_string()]);
    }
}
