//! Matching active task types to their required policies (spec §4.8:
//! "policies injected at session/drive start because an active task
//! requires them").

use std::collections::BTreeSet;

use macf_types::{Manifest, PolicyEntry, TaskType};

/// Union of policies required by any of `active_task_types`, restricted to
/// what's visible under the manifest's current layer/language/consciousness
/// filters.
pub fn filter_active_policies<'a>(manifest: &'a Manifest, active_task_types: &[TaskType]) -> Vec<&'a PolicyEntry> {
    let mut required: BTreeSet<String> = BTreeSet::new();
    for task_type in active_task_types {
        required.extend(manifest.policies_for_task_type(*task_type));
    }
    manifest
        .visible_policies()
        .into_iter()
        .filter(|policy| required.contains(&policy.name))
        .collect()
}

/// Resolve a policy's source file on disk, searching the project overlay
/// directory before the framework base (spec §4.8 "project policies shadow
/// framework policies of the same name").
pub fn find_policy_file(policy_name: &str, project_policies_dir: &std::path::Path, base_policies_dir: &std::path::Path) -> Option<std::path::PathBuf> {
    let project_path = project_policies_dir.join(format!("{policy_name}.md"));
    if project_path.is_file() {
        return Some(project_path);
    }
    let base_path = base_policies_dir.join(format!("{policy_name}.md"));
    if base_path.is_file() {
        return Some(base_path);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn filter_active_policies_unions_across_task_types() {
        let mut task_type_policies = BTreeMap::new();
        task_type_policies.insert("BUG".to_string(), vec!["bug-protocol".to_string()]);
        task_type_policies.insert("MISSION".to_string(), vec!["mission-protocol".to_string()]);
        let manifest = Manifest {
            active_layers: vec!["base".into()],
            policies: vec![
                PolicyEntry { name: "bug-protocol".into(), layer: "base".into(), languages: vec![], consciousness: vec![], body: "b".into(), keywords: vec![] },
                PolicyEntry { name: "mission-protocol".into(), layer: "base".into(), languages: vec![], consciousness: vec![], body: "m".into(), keywords: vec![] },
                PolicyEntry { name: "unused".into(), layer: "base".into(), languages: vec![], consciousness: vec![], body: "u".into(), keywords: vec![] },
            ],
            task_type_policies,
            ..Default::default()
        };
        let active = filter_active_policies(&manifest, &[TaskType::Bug, TaskType::Mission]);
        let names: Vec<_> = active.iter().map(|p| p.name.as_str()).collect();
        assert!(names.contains(&"bug-protocol"));
        assert!(names.contains(&"mission-protocol"));
        assert!(!names.contains(&"unused"));
    }

    #[test]
    fn find_policy_file_prefers_project_overlay() {
        let dir = tempfile::tempdir().unwrap();
        let project_dir = dir.path().join("project");
        let base_dir = dir.path().join("base");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::create_dir_all(&base_dir).unwrap();
        std::fs::write(base_dir.join("bug-protocol.md"), "base version").unwrap();
        std::fs::write(project_dir.join("bug-protocol.md"), "project version").unwrap();

        let found = find_policy_file("bug-protocol", &project_dir, &base_dir).unwrap();
        assert_eq!(std::fs::read_to_string(found).unwrap(), "project version");
    }
}
