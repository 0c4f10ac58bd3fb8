//! Policy manifest schema (spec §3.7).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::task::TaskType;

/// One entry in the flat policy catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyEntry {
    pub name: String,
    pub layer: String,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub consciousness: Vec<String>,
    pub body: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// The merged framework+project configuration (§3.7). `toml::Value` is used
/// for `custom` so project overlays can carry fields this crate doesn't
/// model yet without losing them on merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub active_layers: Vec<String>,
    #[serde(default)]
    pub active_languages: Vec<String>,
    #[serde(default)]
    pub active_consciousness: Vec<String>,
    #[serde(default)]
    pub policies: Vec<PolicyEntry>,
    /// keyword -> policy names
    #[serde(default)]
    pub discovery_index: BTreeMap<String, Vec<String>>,
    /// task_type -> policy names to inject when a task of that type becomes active
    #[serde(default)]
    pub task_type_policies: BTreeMap<String, Vec<String>>,
}

impl Manifest {
    /// The subset of `policies` visible under this manifest's active filters.
    pub fn visible_policies(&self) -> Vec<&PolicyEntry> {
        self.policies
            .iter()
            .filter(|p| self.active_layers.iter().any(|l| l == &p.layer))
            .filter(|p| p.languages.is_empty() || p.languages.iter().any(|l| self.active_languages.contains(l)))
            .filter(|p| {
                p.consciousness.is_empty()
                    || p.consciousness
                        .iter()
                        .any(|c| self.active_consciousness.contains(c))
            })
            .collect()
    }

    pub fn policies_for_task_type(&self, task_type: TaskType) -> BTreeSet<String> {
        let key = serde_json::to_value(task_type)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        self.task_type_policies
            .get(&key)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .collect()
    }

    pub fn policy(&self, name: &str) -> Option<&PolicyEntry> {
        self.policies.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_policies_respects_active_layers() {
        let manifest = Manifest {
            active_layers: vec!["base".into()],
            active_languages: vec![],
            active_consciousness: vec![],
            policies: vec![
                PolicyEntry {
                    name: "a".into(),
                    layer: "base".into(),
                    languages: vec![],
                    consciousness: vec![],
                    body: "a".into(),
                    keywords: vec![],
                },
                PolicyEntry {
                    name: "b".into(),
                    layer: "project".into(),
                    languages: vec![],
                    consciousness: vec![],
                    body: "b".into(),
                    keywords: vec![],
                },
            ],
            discovery_index: BTreeMap::new(),
            task_type_policies: BTreeMap::new(),
        };
        let visible: Vec<_> = manifest.visible_policies().into_iter().map(|p| p.name.clone()).collect();
        assert_eq!(visible, vec!["a".to_string()]);
    }

    #[test]
    fn policies_for_task_type_reads_the_map() {
        let mut task_type_policies = BTreeMap::new();
        task_type_policies.insert("BUG".to_string(), vec!["bug-protocol".to_string()]);
        let manifest = Manifest {
            task_type_policies,
            ..Default::default()
        };
        let policies = manifest.policies_for_task_type(TaskType::Bug);
        assert!(policies.contains("bug-protocol"));
    }
}
