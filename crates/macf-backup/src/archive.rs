//! Archive creation and extraction (spec §4.11): `.tar.xz` whose final
//! entry is `manifest.json`. Extraction shells out to the platform's own
//! `xz`/`tar` first (the most portable across BSD/Linux xz variants) and
//! falls back to the in-process `tar`+`xz2` reader only when that fails.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use xz2::read::XzDecoder;
use xz2::write::XzEncoder;

use crate::hash::sha256_file;
use crate::manifest::{modified_at_rfc3339, Manifest, ManifestEntry, SourceFile, MANIFEST_ARCHIVE_PATH};

/// Write `sources` into a `.tar.xz` at `output`, with `manifest.json` as
/// the last entry.
pub fn create_archive(sources: &[SourceFile], output: &Path) -> Result<Manifest> {
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(output).with_context(|| format!("creating archive {}", output.display()))?;
    let encoder = XzEncoder::new(file, 6);
    let mut builder = tar::Builder::new(encoder);

    let mut entries = Vec::with_capacity(sources.len());
    for source in sources {
        let metadata = std::fs::metadata(&source.source_path)
            .with_context(|| format!("stat {}", source.source_path.display()))?;
        let entry = ManifestEntry {
            archive_path: source.archive_path.clone(),
            source_path: source.source_path.clone(),
            size_bytes: metadata.len(),
            modified_at: modified_at_rfc3339(&source.source_path)?,
            category: source.category.clone(),
            critical: source.critical,
            sha256: sha256_file(&source.source_path)?,
        };
        builder
            .append_path_with_name(&source.source_path, &source.archive_path)
            .with_context(|| format!("archiving {}", source.source_path.display()))?;
        entries.push(entry);
    }

    let manifest = Manifest { entries };
    let manifest_bytes = manifest.to_json_bytes()?;
    let mut header = tar::Header::new_gnu();
    header.set_size(manifest_bytes.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, MANIFEST_ARCHIVE_PATH, manifest_bytes.as_slice())?;

    let encoder = builder.into_inner().context("finishing tar stream")?;
    encoder.finish().context("finishing xz stream")?.flush()?;
    Ok(manifest)
}

/// Read `manifest.json` out of an archive without extracting everything.
pub fn read_manifest(archive: &Path) -> Result<Manifest> {
    let file = File::open(archive)?;
    let mut tar = tar::Archive::new(XzDecoder::new(file));
    for entry in tar.entries()? {
        let mut entry = entry?;
        if entry.path()?.to_string_lossy() == MANIFEST_ARCHIVE_PATH {
            let mut bytes = Vec::new();
            std::io::Read::read_to_end(&mut entry, &mut bytes)?;
            return Ok(Manifest::from_json_bytes(&bytes)?);
        }
    }
    anyhow::bail!("archive {} has no manifest.json entry", archive.display())
}

/// Extract the full archive to `target`, preferring the platform's own
/// `xz`/`tar` binaries and falling back to the in-process reader.
pub fn extract(archive: &Path, target: &Path) -> Result<()> {
    std::fs::create_dir_all(target)?;
    match extract_via_system_tools(archive, target) {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::warn!(error = %e, "system xz|tar pipeline unavailable, falling back to in-process reader");
            extract_via_library(archive, target)
        }
    }
}

fn extract_via_system_tools(archive: &Path, target: &Path) -> Result<()> {
    let mut xz = Command::new("xz").arg("-dc").arg(archive).stdout(Stdio::piped()).spawn().context("spawning xz")?;
    let xz_stdout = xz.stdout.take().ok_or_else(|| anyhow::anyhow!("xz produced no stdout pipe"))?;

    let mut tar = Command::new("tar")
        .arg("-x")
        .arg("-C")
        .arg(target)
        .stdin(xz_stdout)
        .spawn()
        .context("spawning tar")?;
    let tar_status = tar.wait().context("waiting for tar")?;
    let xz_status = xz.wait().context("waiting for xz")?;
    if !tar_status.success() || !xz_status.success() {
        anyhow::bail!("xz|tar pipeline failed (xz: {xz_status}, tar: {tar_status})");
    }
    Ok(())
}

fn extract_via_library(archive: &Path, target: &Path) -> Result<()> {
    let file = File::open(archive)?;
    let mut tar = tar::Archive::new(XzDecoder::new(file));
    tar.unpack(target)?;
    Ok(())
}

pub fn archive_entry_path(archive_root: &Path, entry: &ManifestEntry) -> PathBuf {
    archive_root.join(&entry.archive_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_read_manifest_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("note.txt");
        std::fs::write(&source, b"hello archive").unwrap();
        let output = dir.path().join("out.tar.xz");

        let sources = vec![SourceFile::new(&source, "note.txt", "config", true)];
        let written = create_archive(&sources, &output).unwrap();
        assert_eq!(written.entries.len(), 1);
        assert_eq!(written.entries[0].size_bytes, 13);

        let read_back = read_manifest(&output).unwrap();
        assert_eq!(read_back, written);
    }

    #[test]
    fn extract_via_library_recovers_the_original_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("note.txt");
        std::fs::write(&source, b"hello archive").unwrap();
        let output = dir.path().join("out.tar.xz");
        create_archive(&[SourceFile::new(&source, "note.txt", "config", true)], &output).unwrap();

        let target = dir.path().join("restored");
        extract_via_library(&output, &target).unwrap();
        let restored = std::fs::read_to_string(target.join("note.txt")).unwrap();
        assert_eq!(restored, "hello archive");
    }
}
