//! Path resolution (spec §6 external interfaces, §9 redesign flag: an
//! `Environment` abstraction owning all of this rather than ad hoc
//! `env::var` calls scattered through the hook runners).

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Resolve the project root: `MACEFF_AGENT_HOME_DIR` if set, otherwise the
/// current working directory (spec §6: "canonical project root
/// (preferred)").
pub fn resolve_project_root(explicit: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(expand_tilde(path));
    }
    if let Ok(env_path) = std::env::var("MACEFF_AGENT_HOME_DIR") {
        return Ok(expand_tilde(&env_path));
    }
    Ok(std::env::current_dir()?)
}

/// Resolve the event log path by the priority chain from spec §4.1 step 1:
/// test override > env override > `.{project}/agent_events_log.jsonl` >
/// fallback CWD.
pub fn resolve_events_log_path(project_root: &Path, test_override: Option<&str>) -> PathBuf {
    if let Some(path) = test_override {
        return expand_tilde(path);
    }
    if let Ok(env_path) = std::env::var("MACF_EVENTS_LOG_PATH") {
        return expand_tilde(&env_path);
    }
    project_root.join(".macf").join("agent_events_log.jsonl")
}

pub fn resolve_tasks_root(project_root: &Path) -> PathBuf {
    project_root.join(".macf").join("tasks")
}

pub fn resolve_proxy_log_path(project_root: &Path) -> PathBuf {
    project_root.join(".macf").join("agent_api_log.jsonl")
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}

/// SHA-256 of the canonicalized project root, or of the git common
/// directory when the root is a worktree (so every worktree of the same
/// repository shares one project hash).
pub fn project_hash_from_root(project_root: &Path) -> String {
    let hash_target = detect_git_common_dir(project_root).unwrap_or_else(|| normalize_path(project_root));
    let mut hasher = Sha256::new();
    hasher.update(hash_target.to_string_lossy().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// The host agent mangles a project path into a directory name under
/// `~/.claude/projects/` by replacing path separators. We need the same
/// mangling to locate the transcript (spec §6: "Host agent transcript").
pub fn mangle_project_path(project_root: &Path) -> String {
    normalize_path(project_root)
        .to_string_lossy()
        .replace(['/', '\\'], "-")
}

pub fn host_transcript_dir(project_root: &Path) -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| Error::Config("no home directory".to_string()))?;
    Ok(home
        .join(".claude")
        .join("projects")
        .join(mangle_project_path(project_root)))
}

fn detect_git_common_dir(path: &Path) -> Option<PathBuf> {
    use std::process::Command;

    let git_dir = Command::new("git")
        .args(["rev-parse", "--git-dir"])
        .current_dir(path)
        .output()
        .ok()?;
    let git_common_dir = Command::new("git")
        .args(["rev-parse", "--git-common-dir"])
        .current_dir(path)
        .output()
        .ok()?;
    if !git_dir.status.success() || !git_common_dir.status.success() {
        return None;
    }
    let git_dir_path = normalize_path(Path::new(String::from_utf8_lossy(&git_dir.stdout).trim()));
    let git_common_dir_path =
        normalize_path(Path::new(String::from_utf8_lossy(&git_common_dir.stdout).trim()));
    if git_dir_path != git_common_dir_path {
        Some(git_common_dir_path)
    } else {
        None
    }
}

pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_log_path_honors_test_override() {
        let root = Path::new("/tmp/whatever");
        let path = resolve_events_log_path(root, Some("/tmp/override.jsonl"));
        assert_eq!(path, PathBuf::from("/tmp/override.jsonl"));
    }

    #[test]
    fn events_log_path_falls_back_to_project_dotdir() {
        // SAFETY: test runs single-threaded within this process's env mutation scope.
        unsafe {
            std::env::remove_var("MACF_EVENTS_LOG_PATH");
        }
        let root = Path::new("/tmp/myproject");
        let path = resolve_events_log_path(root, None);
        assert_eq!(path, PathBuf::from("/tmp/myproject/.macf/agent_events_log.jsonl"));
    }

    #[test]
    fn project_hash_is_stable_for_the_same_path() {
        let a = project_hash_from_root(Path::new("/tmp"));
        let b = project_hash_from_root(Path::new("/tmp"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }
}
