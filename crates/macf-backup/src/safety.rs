//! Restore-target safety check (spec §4.11): refuse to extract over an
//! existing consciousness unless `--force`, and even then checkpoint it
//! first.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Markers that indicate `target` already holds a live agent consciousness.
const CONSCIOUSNESS_MARKERS: &[&str] = &[".maceff", "agent", ".claude"];

pub fn has_existing_consciousness(target: &Path) -> bool {
    CONSCIOUSNESS_MARKERS.iter().any(|marker| target.join(marker).exists())
}

/// Copy `target`'s existing contents aside into `target/../pre_restore_{ts}`
/// before a forced restore overwrites them. Returns the checkpoint path.
pub fn checkpoint(target: &Path, timestamp: &str) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(target);
    let checkpoint_dir = parent.join(format!("pre_restore_{timestamp}"));
    std::fs::create_dir_all(&checkpoint_dir)
        .with_context(|| format!("creating checkpoint dir {}", checkpoint_dir.display()))?;
    copy_dir_recursive(target, &checkpoint_dir)
        .with_context(|| format!("checkpointing {} to {}", target.display(), checkpoint_dir.display()))?;
    Ok(checkpoint_dir)
}

fn copy_dir_recursive(source: &Path, dest: &Path) -> std::io::Result<()> {
    if !source.exists() {
        return Ok(());
    }
    for entry in walkdir::WalkDir::new(source).min_depth(1) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(source).expect("walkdir yields children of source");
        let target_path = dest.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target_path)?;
        } else if entry.file_type().is_symlink() {
            let link_target = std::fs::read_link(entry.path())?;
            #[cfg(unix)]
            std::os::unix::fs::symlink(link_target, &target_path)?;
        } else {
            if let Some(parent) = target_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target_path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_directory_has_no_consciousness() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!has_existing_consciousness(dir.path()));
    }

    #[test]
    fn a_claude_directory_counts_as_existing_consciousness() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".claude")).unwrap();
        assert!(has_existing_consciousness(dir.path()));
    }

    #[test]
    fn checkpoint_copies_files_and_preserves_relative_layout() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("live");
        std::fs::create_dir_all(target.join("agent/notes")).unwrap();
        std::fs::write(target.join("agent/notes/a.md"), b"note").unwrap();

        let checkpoint_dir = checkpoint(&target, "20260101T000000Z").unwrap();
        assert_eq!(checkpoint_dir, dir.path().join("pre_restore_20260101T000000Z"));
        let restored = std::fs::read_to_string(checkpoint_dir.join("agent/notes/a.md")).unwrap();
        assert_eq!(restored, "note");
    }
}
