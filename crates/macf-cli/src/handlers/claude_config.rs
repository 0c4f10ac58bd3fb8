use anyhow::{Context, Result};
use serde_json::json;

use crate::args::ClaudeConfigCommand;
use crate::runtime::Runtime;

/// `claude-config init`/`claude-config show` (spec §6): the host agent's
/// own `.claude/settings.local.json`, distinct from the policy manifest
/// `config` manages.
pub fn handle(rt: &Runtime, command: ClaudeConfigCommand) -> Result<()> {
    match command {
        ClaudeConfigCommand::Init => init(rt),
        ClaudeConfigCommand::Show => show(rt),
    }
}

fn init(rt: &Runtime) -> Result<()> {
    let path = rt.claude_settings_path();
    if path.exists() {
        println!("{} already exists", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let skeleton = json!({ "permissions": { "allow": [], "deny": [] }, "hooks": {} });
    std::fs::write(&path, serde_json::to_vec_pretty(&skeleton)?).with_context(|| format!("writing {}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(())
}

fn show(rt: &Runtime) -> Result<()> {
    let path = rt.claude_settings_path();
    let contents = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    println!("{contents}");
    Ok(())
}
