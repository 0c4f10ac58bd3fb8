use anyhow::{Context, Result};

use crate::args::{ConfigCommand, OutputFormat};
use crate::runtime::{print_json, Runtime};

const DEFAULT_BASE_MANIFEST: &str = r#"active_layers = ["core"]
active_languages = []
active_consciousness = []

[discovery_index]

[task_type_policies]
"#;

/// `config init`/`config show` (spec §6): the layered policy manifest
/// (spec §3.7), a framework base merged with an optional project overlay.
pub fn handle(rt: &Runtime, command: ConfigCommand, format: OutputFormat) -> Result<()> {
    match command {
        ConfigCommand::Init { force } => init(rt, force),
        ConfigCommand::Show => show(rt, format),
    }
}

fn init(rt: &Runtime, force: bool) -> Result<()> {
    let base_path = rt.base_manifest_path();
    if base_path.exists() && !force {
        println!("{} already exists (pass --force to overwrite)", base_path.display());
        return Ok(());
    }
    if let Some(parent) = base_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::create_dir_all(rt.base_policies_dir())?;
    std::fs::create_dir_all(rt.project_policies_dir())?;
    std::fs::write(&base_path, DEFAULT_BASE_MANIFEST).with_context(|| format!("writing {}", base_path.display()))?;
    println!("wrote base manifest to {}", base_path.display());
    Ok(())
}

fn show(rt: &Runtime, format: OutputFormat) -> Result<()> {
    let manifest = rt.load_manifest()?;
    match format {
        OutputFormat::Json => print_json(&manifest),
        OutputFormat::Plain => {
            println!("active_layers: {:?}", manifest.active_layers);
            println!("active_languages: {:?}", manifest.active_languages);
            println!("active_consciousness: {:?}", manifest.active_consciousness);
            println!("policies: {}", manifest.policies.len());
            println!("discovery_index keywords: {}", manifest.discovery_index.len());
            Ok(())
        }
    }
}
