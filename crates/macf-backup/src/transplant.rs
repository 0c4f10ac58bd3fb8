//! Transplant (spec §4.11): before restore, map the source project's
//! absolute paths onto the target's, and apply that mapping to the three
//! places absolute paths leak into a backed-up tree. Most-specific mapping
//! wins; rewrites stop at the first rule that matches an occurrence.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::glob::glob_match;

/// The small set of file-globs (relative to the extracted tree root)
/// that may contain absolute paths needing a transplant rewrite, beyond
/// the settings file and the hook/command/skill/agent symlinks handled
/// separately.
pub const ABSOLUTE_PATH_GLOBS: &[&str] = &["agent/public/roadmaps/*.md", "agent/.internal/*.md", ".macf/*.toml"];

/// Directories under `.claude` whose entries may be symlinks pointing at
/// the original project root.
pub const SYMLINK_DIRS: &[&str] = &["hooks", "commands", "skills", "agents"];

#[derive(Debug, Clone)]
pub struct PathRule {
    pub from: PathBuf,
    pub to: PathBuf,
}

pub struct TransplantMapping {
    /// Sorted longest-`from`-first so the most specific rule wins.
    rules: Vec<PathRule>,
}

impl TransplantMapping {
    pub fn new(mut rules: Vec<PathRule>) -> Self {
        rules.sort_by_key(|r| std::cmp::Reverse(r.from.as_os_str().len()));
        Self { rules }
    }

    /// Build the standard three-way mapping: project root, `.maceff` home,
    /// and `MACEFF_AGENT_HOME_DIR`-style agent home, source to target.
    pub fn for_roots(source_project: &Path, target_project: &Path, source_home: &Path, target_home: &Path) -> Self {
        Self::new(vec![
            PathRule { from: source_home.to_path_buf(), to: target_home.to_path_buf() },
            PathRule { from: source_project.to_path_buf(), to: target_project.to_path_buf() },
        ])
    }

    /// Rewrite every occurrence of a known source path inside `text`,
    /// applying rules most-specific-first and the first matching rule per
    /// occurrence. Returns `None` when nothing in `text` matched.
    pub fn rewrite_text(&self, text: &str) -> Option<String> {
        let mut out = text.to_string();
        let mut changed = false;
        for rule in &self.rules {
            let from = rule.from.to_string_lossy();
            if from.is_empty() {
                continue;
            }
            let to = rule.to.to_string_lossy();
            if out.contains(from.as_ref()) {
                out = out.replace(from.as_ref(), to.as_ref());
                changed = true;
            }
        }
        changed.then_some(out)
    }
}

/// (a) rewrite absolute paths in `.claude/settings.local.json`'s
/// permission lists.
pub fn rewrite_settings_permissions(settings: &mut Value, mapping: &TransplantMapping) -> usize {
    let mut rewritten = 0;
    let Some(permissions) = settings.get_mut("permissions").and_then(Value::as_object_mut) else { return 0 };
    for list in permissions.values_mut() {
        let Some(array) = list.as_array_mut() else { continue };
        for item in array {
            if let Some(s) = item.as_str() {
                if let Some(new_value) = mapping.rewrite_text(s) {
                    *item = Value::String(new_value);
                    rewritten += 1;
                }
            }
        }
    }
    rewritten
}

/// (b) rewrite symlink targets inside `.claude/{hooks,commands,skills,agents}`.
pub fn rewrite_symlinks(claude_dir: &Path, mapping: &TransplantMapping) -> std::io::Result<usize> {
    let mut rewritten = 0;
    for subdir in SYMLINK_DIRS {
        let dir = claude_dir.join(subdir);
        if !dir.is_dir() {
            continue;
        }
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type()?.is_symlink() {
                continue;
            }
            let target = std::fs::read_link(&path)?;
            let Some(new_target) = mapping.rewrite_text(&target.to_string_lossy()) else { continue };
            std::fs::remove_file(&path)?;
            #[cfg(unix)]
            std::os::unix::fs::symlink(&new_target, &path)?;
            rewritten += 1;
        }
    }
    Ok(rewritten)
}

/// (c) rewrite absolute paths appearing in the small glob set under the
/// extracted tree root.
pub fn rewrite_glob_matched_files(root: &Path, mapping: &TransplantMapping) -> std::io::Result<usize> {
    let mut rewritten = 0;
    for entry in walkdir::WalkDir::new(root).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else { continue };
        let relative = relative.to_string_lossy();
        if !ABSOLUTE_PATH_GLOBS.iter().any(|pattern| glob_match(pattern, &relative)) {
            continue;
        }
        let Ok(contents) = std::fs::read_to_string(entry.path()) else { continue };
        if let Some(new_contents) = mapping.rewrite_text(&contents) {
            std::fs::write(entry.path(), new_contents)?;
            rewritten += 1;
        }
    }
    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn most_specific_rule_wins_over_a_shorter_prefix() {
        let mapping = TransplantMapping::new(vec![
            PathRule { from: "/home/agent".into(), to: "/home/new-agent".into() },
            PathRule { from: "/home/agent/project".into(), to: "/home/new-agent/special-project".into() },
        ]);
        let rewritten = mapping.rewrite_text("/home/agent/project/file.txt").unwrap();
        assert_eq!(rewritten, "/home/new-agent/special-project/file.txt");
    }

    #[test]
    fn rewrites_permission_list_entries_containing_the_source_root() {
        let mapping = TransplantMapping::new(vec![PathRule { from: "/old/root".into(), to: "/new/root".into() }]);
        let mut settings = json!({"permissions": {"allow": ["Bash(/old/root/scripts/*.sh)"], "deny": []}});
        let count = rewrite_settings_permissions(&mut settings, &mapping);
        assert_eq!(count, 1);
        assert_eq!(settings["permissions"]["allow"][0], "Bash(/new/root/scripts/*.sh)");
    }

    #[test]
    fn rewrite_text_returns_none_when_nothing_matches() {
        let mapping = TransplantMapping::new(vec![PathRule { from: "/old/root".into(), to: "/new/root".into() }]);
        assert_eq!(mapping.rewrite_text("/unrelated/path"), None);
    }
}
