//! The archive manifest (spec §4.11): the tar's last entry, enumerating
//! every included file with enough metadata to verify or transplant later.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const MANIFEST_ARCHIVE_PATH: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub archive_path: String,
    pub source_path: PathBuf,
    pub size_bytes: u64,
    pub modified_at: String,
    pub category: String,
    pub critical: bool,
    pub sha256: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn entry_for(&self, archive_path: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.archive_path == archive_path)
    }

    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    pub fn from_json_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

/// Source entry before hashing, supplied by the caller of `create_archive`.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub source_path: PathBuf,
    pub archive_path: String,
    pub category: String,
    pub critical: bool,
}

impl SourceFile {
    pub fn new(source_path: impl Into<PathBuf>, archive_path: impl Into<String>, category: impl Into<String>, critical: bool) -> Self {
        Self { source_path: source_path.into(), archive_path: archive_path.into(), category: category.into(), critical }
    }
}

pub fn modified_at_rfc3339(path: &Path) -> std::io::Result<String> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(chrono::DateTime::<chrono::Utc>::from(modified).to_rfc3339())
}
