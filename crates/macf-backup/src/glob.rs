//! A deliberately small `*`-only glob matcher — the "small set of
//! file-globs" in spec §4.11 never needs more than a wildcard extension or
//! directory match, and the pack carries no glob crate.

pub fn glob_match(pattern: &str, candidate: &str) -> bool {
    match pattern.split_once('*') {
        None => pattern == candidate,
        Some((prefix, suffix)) => {
            candidate.len() >= prefix.len() + suffix.len()
                && candidate.starts_with(prefix)
                && candidate.ends_with(suffix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_a_wildcard_extension() {
        assert!(glob_match("*.json", "settings.local.json"));
        assert!(!glob_match("*.json", "settings.local.toml"));
    }

    #[test]
    fn matches_a_directory_prefix_wildcard() {
        assert!(glob_match("agent/public/roadmaps/*", "agent/public/roadmaps/plan.md"));
        assert!(!glob_match("agent/public/roadmaps/*", "agent/private/plan.md"));
    }

    #[test]
    fn an_exact_pattern_with_no_wildcard_matches_exactly() {
        assert!(glob_match(".claude/settings.local.json", ".claude/settings.local.json"));
        assert!(!glob_match(".claude/settings.local.json", ".claude/settings.json"));
    }
}
