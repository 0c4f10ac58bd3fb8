//! Layered manifest merge (spec §3.7, §4.8): a framework base merged with
//! an optional project overlay. Scalars: overlay wins. Lists: concatenated.
//! Nested tables: deep-merged recursively.

use std::path::Path;

use anyhow::{Context, Result};

/// Deep-merge `overlay` into `base` in place, per §3.7's merge semantics.
pub fn deep_merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_table.insert(key, overlay_value);
                    }
                }
            }
        }
        (toml::Value::Array(base_array), toml::Value::Array(overlay_array)) => {
            base_array.extend(overlay_array);
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value;
        }
    }
}

/// Resolve the framework base path and an optional project overlay path,
/// deep-merge, and parse into a [`macf_types::Manifest`]. A missing overlay
/// degrades to the base alone; a missing base is an error (there must be
/// something to serve policies from).
pub fn load_merged_manifest(base_path: &Path, overlay_path: Option<&Path>) -> Result<macf_types::Manifest> {
    let base_text = std::fs::read_to_string(base_path)
        .with_context(|| format!("reading base manifest at {}", base_path.display()))?;
    let mut merged: toml::Value = toml::from_str(&base_text)
        .with_context(|| format!("parsing base manifest at {}", base_path.display()))?;

    if let Some(overlay_path) = overlay_path {
        match std::fs::read_to_string(overlay_path) {
            Ok(overlay_text) => {
                let overlay: toml::Value = toml::from_str(&overlay_text)
                    .with_context(|| format!("parsing project overlay at {}", overlay_path.display()))?;
                deep_merge(&mut merged, overlay);
            }
            Err(_) => {
                // No project overlay: degrade to the framework base alone.
            }
        }
    }

    merged.try_into().context("merged manifest does not match the expected schema")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn scalars_overlay_wins_lists_concat_tables_deep_merge() {
        let mut base: toml::Value = toml::from_str(
            r#"
            active_layers = ["base"]
            [nested]
            a = 1
            b = 2
        "#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
            active_layers = ["project"]
            [nested]
            b = 99
            c = 3
        "#,
        )
        .unwrap();
        deep_merge(&mut base, overlay);
        assert_eq!(
            base["active_layers"].as_array().unwrap().len(),
            2,
            "lists should concatenate"
        );
        assert_eq!(base["nested"]["a"].as_integer(), Some(1));
        assert_eq!(base["nested"]["b"].as_integer(), Some(99), "scalar: overlay wins");
        assert_eq!(base["nested"]["c"].as_integer(), Some(3));
    }

    #[test]
    fn missing_overlay_degrades_to_base_alone() {
        let dir = tempdir().unwrap();
        let base_path = dir.path().join("base.toml");
        std::fs::write(&base_path, "active_layers = [\"base\"]\n").unwrap();
        let manifest = load_merged_manifest(&base_path, Some(&dir.path().join("missing.toml"))).unwrap();
        assert_eq!(manifest.active_layers, vec!["base".to_string()]);
    }
}
