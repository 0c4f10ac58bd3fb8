use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use crate::args::OutputFormat;
use crate::runtime::{print_json, Runtime};

/// Default Claude context window, used when the transcript carries no more
/// specific `context_window_limit` metadata.
const DEFAULT_CONTEXT_WINDOW: u64 = 200_000;

#[derive(Serialize)]
struct BudgetReport {
    model: Option<String>,
    fresh_input_tokens: u64,
    cache_creation_tokens: u64,
    cache_read_tokens: u64,
    output_tokens: u64,
    context_window_tokens: u64,
    context_window_limit: u64,
    used_pct: f64,
}

/// Scan the current session's host transcript tail for the most recent
/// assistant message's `usage` block, and report it against the context
/// window (spec §6 `budget`; no library primitive exists for this since
/// token accounting is entirely the host's concern — we only read what it
/// already logged).
pub fn handle(rt: &Runtime, format: OutputFormat) -> Result<()> {
    let session_id = rt.current_session_id()?;
    let report = match session_id.as_deref().and_then(|s| latest_usage(rt, s)) {
        Some(report) => report,
        None => BudgetReport {
            model: None,
            fresh_input_tokens: 0,
            cache_creation_tokens: 0,
            cache_read_tokens: 0,
            output_tokens: 0,
            context_window_tokens: 0,
            context_window_limit: DEFAULT_CONTEXT_WINDOW,
            used_pct: 0.0,
        },
    };

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Plain => {
            println!(
                "context window: {}/{} tokens ({:.1}%)",
                report.context_window_tokens, report.context_window_limit, report.used_pct
            );
            if let Some(model) = &report.model {
                println!("model: {model}");
            }
        }
    }
    Ok(())
}

fn latest_usage(rt: &Runtime, session_id: &str) -> Option<BudgetReport> {
    let transcripts_dir = macf_core::path::host_transcript_dir(&rt.project_root).ok()?;
    let transcript_path = transcripts_dir.join(format!("{session_id}.jsonl"));
    let contents = std::fs::read_to_string(transcript_path).ok()?;

    for line in contents.lines().rev() {
        let Ok(value) = serde_json::from_str::<Value>(line) else { continue };
        let Some(usage) = value.get("message").and_then(|m| m.get("usage")) else { continue };
        let model = value.get("message").and_then(|m| m.get("model")).and_then(|m| m.as_str()).map(str::to_string);
        let fresh_input = field_u64(usage, "input_tokens");
        let cache_creation = field_u64(usage, "cache_creation_input_tokens");
        let cache_read = field_u64(usage, "cache_read_input_tokens");
        let output = field_u64(usage, "output_tokens");
        let context_window_tokens = fresh_input + cache_creation + cache_read + output;
        let limit = value
            .get("context_window_limit")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_CONTEXT_WINDOW);
        return Some(BudgetReport {
            model,
            fresh_input_tokens: fresh_input,
            cache_creation_tokens: cache_creation,
            cache_read_tokens: cache_read,
            output_tokens: output,
            context_window_tokens,
            context_window_limit: limit,
            used_pct: (context_window_tokens as f64 / limit as f64) * 100.0,
        });
    }
    None
}

fn field_u64(usage: &Value, field: &str) -> u64 {
    usage.get(field).and_then(Value::as_u64).unwrap_or(0)
}
