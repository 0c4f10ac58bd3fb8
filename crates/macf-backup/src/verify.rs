//! `verify(manifest, dir)` (spec §4.11): re-hash every listed file, report
//! discrepancies. Broken symlinks are warnings; everything else fails.

use std::path::Path;

use serde::Serialize;

use crate::hash::sha256_file;
use crate::manifest::Manifest;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VerifyReport {
    pub missing: Vec<String>,
    pub corrupted: Vec<String>,
    pub size_mismatch: Vec<String>,
    pub broken_symlinks: Vec<String>,
}

impl VerifyReport {
    /// Passes verification when nothing but broken symlinks was found.
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty() && self.corrupted.is_empty() && self.size_mismatch.is_empty()
    }
}

pub fn verify(manifest: &Manifest, dir: &Path) -> VerifyReport {
    let mut report = VerifyReport::default();
    for entry in &manifest.entries {
        let path = dir.join(&entry.archive_path);

        let meta = match std::fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(_) => {
                report.missing.push(entry.archive_path.clone());
                continue;
            }
        };

        if meta.file_type().is_symlink() {
            if std::fs::metadata(&path).is_err() {
                report.broken_symlinks.push(entry.archive_path.clone());
            }
            continue;
        }

        if meta.len() != entry.size_bytes {
            report.size_mismatch.push(entry.archive_path.clone());
            continue;
        }

        match sha256_file(&path) {
            Ok(hash) if hash == entry.sha256 => {}
            _ => report.corrupted.push(entry.archive_path.clone()),
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestEntry;

    fn entry(archive_path: &str, size_bytes: u64, sha256: &str) -> ManifestEntry {
        ManifestEntry {
            archive_path: archive_path.to_string(),
            source_path: archive_path.into(),
            size_bytes,
            modified_at: String::new(),
            category: "config".to_string(),
            critical: false,
            sha256: sha256.to_string(),
        }
    }

    #[test]
    fn reports_a_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest { entries: vec![entry("gone.txt", 1, "deadbeef")] };
        let report = verify(&manifest, dir.path());
        assert_eq!(report.missing, vec!["gone.txt".to_string()]);
        assert!(!report.is_ok());
    }

    #[test]
    fn a_matching_file_verifies_clean() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ok.txt"), b"hi").unwrap();
        let sha = sha256_file(&dir.path().join("ok.txt")).unwrap();
        let manifest = Manifest { entries: vec![entry("ok.txt", 2, &sha)] };
        let report = verify(&manifest, dir.path());
        assert!(report.is_ok());
        assert!(report.missing.is_empty() && report.corrupted.is_empty());
    }

    #[test]
    fn a_changed_file_is_reported_corrupted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("changed.txt"), b"new content here").unwrap();
        let manifest = Manifest { entries: vec![entry("changed.txt", 2, "not-the-real-hash")] };
        let report = verify(&manifest, dir.path());
        assert_eq!(report.size_mismatch, vec!["changed.txt".to_string()]);
    }

    #[test]
    fn a_broken_symlink_is_a_warning_not_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(dir.path().join("nonexistent-target"), dir.path().join("link")).unwrap();
            let manifest = Manifest { entries: vec![entry("link", 0, "")] };
            let report = verify(&manifest, dir.path());
            assert_eq!(report.broken_symlinks, vec!["link".to_string()]);
            assert!(report.is_ok());
        }
    }
}
