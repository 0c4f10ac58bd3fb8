//! Restore orchestration (spec §4.11): safety check, optional checkpoint,
//! extraction, optional transplant, and a closing verify pass.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::archive::{extract, read_manifest};
use crate::safety::{checkpoint, has_existing_consciousness};
use crate::transplant::{rewrite_glob_matched_files, rewrite_settings_permissions, rewrite_symlinks, TransplantMapping};
use crate::verify::{verify, VerifyReport};

pub struct RestoreOptions {
    pub force: bool,
    pub dry_run: bool,
    pub transplant: Option<TransplantMapping>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestoreReport {
    pub extracted_to: PathBuf,
    pub checkpoint_path: Option<PathBuf>,
    pub settings_rewritten: usize,
    pub symlinks_rewritten: usize,
    pub globs_rewritten: usize,
    pub verify: VerifyReport,
}

/// Restore `archive` into `target`, honoring `options`. `timestamp` names
/// any checkpoint directory created along the way and must come from the
/// caller since this crate never calls `SystemTime::now()` internally.
pub fn restore(archive: &Path, target: &Path, options: RestoreOptions, timestamp: &str) -> Result<RestoreReport> {
    let existing = has_existing_consciousness(target);
    if existing && !options.force {
        anyhow::bail!(
            "refusing to restore into {}: an existing consciousness was found there (pass --force to override)",
            target.display()
        );
    }

    if options.dry_run {
        let manifest = read_manifest(archive)?;
        return Ok(RestoreReport {
            extracted_to: target.to_path_buf(),
            checkpoint_path: None,
            settings_rewritten: 0,
            symlinks_rewritten: 0,
            globs_rewritten: 0,
            verify: VerifyReport { missing: manifest.entries.iter().map(|e| e.archive_path.clone()).collect(), ..Default::default() },
        });
    }

    let checkpoint_path =
        if existing && options.force { Some(checkpoint(target, timestamp).context("checkpointing existing target")?) } else { None };

    extract(archive, target).with_context(|| format!("extracting {} into {}", archive.display(), target.display()))?;

    let mut settings_rewritten = 0;
    let mut symlinks_rewritten = 0;
    let mut globs_rewritten = 0;
    if let Some(mapping) = &options.transplant {
        let settings_path = target.join(".claude/settings.local.json");
        if let Ok(raw) = std::fs::read_to_string(&settings_path) {
            if let Ok(mut settings) = serde_json::from_str(&raw) {
                settings_rewritten = rewrite_settings_permissions(&mut settings, mapping);
                if settings_rewritten > 0 {
                    std::fs::write(&settings_path, serde_json::to_vec_pretty(&settings)?)?;
                }
            }
        }
        symlinks_rewritten = rewrite_symlinks(&target.join(".claude"), mapping).unwrap_or(0);
        globs_rewritten = rewrite_glob_matched_files(target, mapping).unwrap_or(0);
    }

    let manifest = read_manifest(archive)?;
    let verify_report = verify(&manifest, target);

    Ok(RestoreReport {
        extracted_to: target.to_path_buf(),
        checkpoint_path,
        settings_rewritten,
        symlinks_rewritten,
        globs_rewritten,
        verify: verify_report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::SourceFile;

    #[test]
    fn refuses_to_restore_over_existing_consciousness_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let archive_dir = dir.path().join("src");
        std::fs::create_dir_all(&archive_dir).unwrap();
        let note = archive_dir.join("note.txt");
        std::fs::write(&note, b"hi").unwrap();
        let archive_path = dir.path().join("out.tar.xz");
        crate::archive::create_archive(&[SourceFile::new(&note, "note.txt", "config", false)], &archive_path).unwrap();

        let target = dir.path().join("target");
        std::fs::create_dir_all(target.join(".claude")).unwrap();

        let result = restore(&archive_path, &target, RestoreOptions { force: false, dry_run: false, transplant: None }, "20260101T000000Z");
        assert!(result.is_err());
    }

    #[test]
    fn restores_cleanly_into_an_empty_target_and_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let archive_dir = dir.path().join("src");
        std::fs::create_dir_all(&archive_dir).unwrap();
        let note = archive_dir.join("note.txt");
        std::fs::write(&note, b"hi there").unwrap();
        let archive_path = dir.path().join("out.tar.xz");
        crate::archive::create_archive(&[SourceFile::new(&note, "note.txt", "config", false)], &archive_path).unwrap();

        let target = dir.path().join("target");
        let report =
            restore(&archive_path, &target, RestoreOptions { force: false, dry_run: false, transplant: None }, "20260101T000000Z")
                .unwrap();
        assert!(report.verify.is_ok());
        assert!(report.checkpoint_path.is_none());
        let restored = std::fs::read_to_string(target.join("note.txt")).unwrap();
        assert_eq!(restored, "hi there");
    }

    #[test]
    fn dry_run_reports_manifest_contents_without_writing_anything() {
        let dir = tempfile::tempdir().unwrap();
        let archive_dir = dir.path().join("src");
        std::fs::create_dir_all(&archive_dir).unwrap();
        let note = archive_dir.join("note.txt");
        std::fs::write(&note, b"hi").unwrap();
        let archive_path = dir.path().join("out.tar.xz");
        crate::archive::create_archive(&[SourceFile::new(&note, "note.txt", "config", false)], &archive_path).unwrap();

        let target = dir.path().join("target");
        let report =
            restore(&archive_path, &target, RestoreOptions { force: false, dry_run: true, transplant: None }, "20260101T000000Z")
                .unwrap();
        assert!(!target.exists());
        assert_eq!(report.verify.missing, vec!["note.txt".to_string()]);
    }
}
