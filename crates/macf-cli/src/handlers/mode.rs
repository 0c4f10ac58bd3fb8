use anyhow::Result;
use macf_types::event::AutoModeDetectedData;
use macf_types::EventKind;

use crate::args::{ModeCommand, ModeValue, OutputFormat};
use crate::runtime::{print_json, Runtime};

pub fn handle(rt: &Runtime, command: ModeCommand, format: OutputFormat) -> Result<()> {
    match command {
        ModeCommand::Get => get(rt, format),
        ModeCommand::Set { value, auth_token } => set(rt, value, auth_token.as_deref(), format),
    }
}

fn get(rt: &Runtime, format: OutputFormat) -> Result<()> {
    let session_id = rt.current_session_id()?;
    let mode = macf_projections::auto_mode(&rt.log, session_id.as_deref())?;
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "enabled": mode.enabled,
            "source": format!("{:?}", mode.source),
            "confidence": mode.confidence,
        })),
        OutputFormat::Plain => {
            println!("{} (source={:?}, confidence={})", if mode.enabled { "AUTO_MODE" } else { "MANUAL_MODE" }, mode.source, mode.confidence);
            Ok(())
        }
    }
}

/// An explicit `mode set` is an operator override: recorded with
/// `source = "config"`, one rung below an env var override in the
/// `auto_mode` priority table but above a session heuristic.
fn set(rt: &Runtime, value: ModeValue, auth_token: Option<&str>, format: OutputFormat) -> Result<()> {
    let session_id = rt.current_session_id()?.unwrap_or_else(|| "unknown".to_string());
    let breadcrumb = rt.mint_breadcrumb(&session_id, None);
    let enabled = matches!(value, ModeValue::AutoMode);
    let hook_input = auth_token.map(|token| serde_json::json!({ "auth_token": token }));
    let kind = EventKind::AutoModeDetected(AutoModeDetectedData { enabled, source: "config".to_string(), confidence: 1.0 });
    rt.log.append(&breadcrumb, kind, hook_input);
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "enabled": enabled, "source": "config" })),
        OutputFormat::Plain => {
            println!("mode set to {}", if enabled { "AUTO_MODE" } else { "MANUAL_MODE" });
            Ok(())
        }
    }
}
