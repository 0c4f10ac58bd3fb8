//! PID file lifecycle (spec §4.9: "writes its PID to a runtime file").

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Write the current process's PID to `path`, creating parent directories
    /// as needed.
    pub fn write(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        std::fs::write(&path, std::process::id().to_string())
            .with_context(|| format!("writing pid file at {}", path.display()))?;
        Ok(Self { path })
    }

    pub fn read(path: &Path) -> Option<u32> {
        std::fs::read_to_string(path).ok()?.trim().parse().ok()
    }

    pub fn remove(&self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips_the_pid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search-daemon.pid");
        let pid_file = PidFile::write(&path).unwrap();
        assert_eq!(PidFile::read(&path), Some(std::process::id()));
        drop(pid_file);
        assert!(!path.exists());
    }
}
