use anyhow::{Context, Result};
use serde_json::json;

use crate::runtime::Runtime;

/// Print a one-line status summary (spec §6 `statusline generate`): the
/// format Claude Code's `statusLine` hook expects on stdout. Reads an
/// optional JSON blob on stdin (the host sends `{model, session_id, ...}`)
/// but tolerates its absence.
pub fn generate(rt: &Runtime) -> Result<()> {
    let session_id = rt.current_session_id()?;
    let cycle = macf_projections::cycle_number(&rt.log).unwrap_or(0);
    let auto_mode = session_id
        .as_deref()
        .map(|s| macf_projections::auto_mode(&rt.log, Some(s)))
        .transpose()?
        .unwrap_or_default();

    let mode_label = if auto_mode.enabled { "AUTO" } else { "MANUAL" };
    let session_label = session_id.as_deref().map(|s| &s[..s.len().min(8)]).unwrap_or("no-session");
    println!("[macf] {session_label} c{cycle} {mode_label}");
    Ok(())
}

/// Write the `statusLine` entry into `.claude/settings.local.json` pointing
/// at this binary's `statusline generate` subcommand.
pub fn install(rt: &Runtime) -> Result<()> {
    let path = rt.claude_settings_path();
    let mut settings: serde_json::Value = if path.exists() {
        serde_json::from_str(&std::fs::read_to_string(&path)?)?
    } else {
        json!({})
    };
    settings["statusLine"] = json!({
        "type": "command",
        "command": "macf statusline generate",
    });
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, serde_json::to_vec_pretty(&settings)?).with_context(|| format!("writing {}", path.display()))?;
    println!("installed statusLine command in {}", path.display());
    Ok(())
}
