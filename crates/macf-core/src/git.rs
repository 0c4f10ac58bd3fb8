//! Git metadata helper used when minting breadcrumbs (spec §3.1's `g_` segment).
//!
//! Hook runners have a 250ms budget (§5); shelling out to git must never be
//! allowed to block past that, so the call here is bounded well under it and
//! failure degrades to `None` rather than propagating an error.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

const GIT_TIMEOUT: Duration = Duration::from_millis(150);

/// The short commit hash (7 chars) of `HEAD` in `project_root`, or `None` if
/// there's no repo, no commits, or the call didn't finish in time.
pub fn current_git_hash(project_root: &Path) -> Option<String> {
    let mut child = Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .current_dir(project_root)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .ok()?;

    let deadline = Instant::now() + GIT_TIMEOUT;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                if !status.success() {
                    return None;
                }
                let output = child.wait_with_output().ok()?;
                let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
                return if hash.is_empty() { None } else { Some(hash) };
            }
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return None;
                }
                std::thread::sleep(Duration::from_millis(5));
            }
            Err(_) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_git_directory_returns_none() {
        assert!(current_git_hash(Path::new("/")).is_none());
    }
}
