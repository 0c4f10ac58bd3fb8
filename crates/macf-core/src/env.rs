//! Resolution of the environment variables listed in spec §6.

use std::path::PathBuf;

/// Agent identity for multi-agent path scoping: `MACEFF_USER`, falling back
/// to `USER`.
pub fn agent_user() -> Option<String> {
    std::env::var("MACEFF_USER")
        .or_else(|_| std::env::var("USER"))
        .ok()
}

/// `MACF_AUTO_MODE=true|false`, the top-priority auto-mode signal (confidence
/// 0.9 per §4.3's source-priority tie-break). `None` if unset or unparsable.
pub fn auto_mode_env_override() -> Option<bool> {
    match std::env::var("MACF_AUTO_MODE").ok()?.as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct BackupConfig {
    pub dir: Option<PathBuf>,
    pub keep: Option<u32>,
}

pub fn backup_config() -> BackupConfig {
    BackupConfig {
        dir: std::env::var("MACF_BACKUP_DIR").ok().map(PathBuf::from),
        keep: std::env::var("MACF_BACKUP_KEEP")
            .ok()
            .and_then(|v| v.parse().ok()),
    }
}

pub fn timezone() -> Option<String> {
    std::env::var("MACEFF_TZ").ok()
}

pub fn templates_dir() -> Option<PathBuf> {
    std::env::var("MACEFF_TEMPLATES_DIR").ok().map(PathBuf::from)
}

/// `MACEFF_ROOT`, the root under which `MACEFF_AGENT_HOME_DIR` and sibling
/// multi-agent installations are typically found. Not required for a
/// single-agent deployment.
pub fn maceff_root() -> Option<PathBuf> {
    std::env::var("MACEFF_ROOT").ok().map(PathBuf::from)
}

pub fn proxy_capture_dir() -> Option<PathBuf> {
    std::env::var("MACF_PROXY_CAPTURE_DIR").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_mode_override_parses_true_false_only() {
        unsafe {
            std::env::set_var("MACF_AUTO_MODE", "true");
        }
        assert_eq!(auto_mode_env_override(), Some(true));
        unsafe {
            std::env::set_var("MACF_AUTO_MODE", "garbage");
        }
        assert_eq!(auto_mode_env_override(), None);
        unsafe {
            std::env::remove_var("MACF_AUTO_MODE");
        }
        assert_eq!(auto_mode_env_override(), None);
    }
}
