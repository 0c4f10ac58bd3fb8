use std::io::Read;

use anyhow::{Context, Result};
use serde_json::json;

use macf_hooks::{dispatch, DispatchEnv, HookContext, RUNNER_NAMES};

use crate::args::{HooksCommand, OutputFormat};
use crate::runtime::{print_json, Runtime};

pub fn handle(rt: &Runtime, command: HooksCommand, format: OutputFormat) -> Result<()> {
    match command {
        HooksCommand::Install { local, global } => install(rt, local || !global),
        HooksCommand::Test { runner, input } => test(rt, &runner, input.as_deref()),
        HooksCommand::Logs { session, limit } => logs(rt, session.as_deref(), limit, format),
        HooksCommand::Status => status(rt, format),
    }
}

/// Register each runner name as a Claude Code hook entry in
/// `.claude/settings.local.json`, scoped to `--local` (this project) or
/// `--global` (the agent's own `~/.claude/settings.json`).
fn install(rt: &Runtime, local: bool) -> Result<()> {
    let path = if local { rt.claude_settings_path() } else { dirs::home_dir().context("no home dir")?.join(".claude").join("settings.json") };

    let mut settings: serde_json::Value = if path.exists() {
        serde_json::from_str(&std::fs::read_to_string(&path)?)?
    } else {
        json!({})
    };
    let hooks = settings.as_object_mut().unwrap().entry("hooks").or_insert_with(|| json!({}));
    for runner in RUNNER_NAMES {
        hooks[event_name(runner)] = json!([{
            "matcher": "*",
            "hooks": [{ "type": "command", "command": format!("macf hooks test {runner}") }],
        }]);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, serde_json::to_vec_pretty(&settings)?)?;
    println!("installed {} hook runners into {}", RUNNER_NAMES.len(), path.display());
    Ok(())
}

fn event_name(runner: &str) -> String {
    let mut result = String::new();
    for (i, part) in runner.split('_').enumerate() {
        if i == 0 {
            result.push_str(part);
            continue;
        }
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            result.push_str(chars.as_str());
        }
    }
    result
}

/// Run a single named runner against a JSON input (file or stdin) without
/// side effects — `testing: true` so no event is appended.
fn test(rt: &Runtime, runner: &str, input_path: Option<&std::path::Path>) -> Result<()> {
    let raw = match input_path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let input_json: serde_json::Value = serde_json::from_str(&raw).context("parsing hook input JSON")?;
    let ctx = HookContext::new(&rt.project_root, rt.log.path(), true);
    let manifest = rt.load_manifest().unwrap_or_default();
    let env = DispatchEnv { ctx: &ctx, manifest: &manifest, search_daemon_addr: "127.0.0.1:9001", auto_mode: false };
    let output = dispatch(runner, input_json, &env)?;
    print_json(&output)
}

fn logs(rt: &Runtime, session: Option<&str>, limit: usize, format: OutputFormat) -> Result<()> {
    let records = rt.log.query(&macf_eventlog::query::QueryFilters {
        session_id: session.map(str::to_string),
        ..Default::default()
    })?;
    let tail: Vec<_> = records.into_iter().rev().take(limit).collect();
    match format {
        OutputFormat::Json => print_json(&tail),
        OutputFormat::Plain => {
            for record in &tail {
                println!("{} {} {}", record.timestamp, record.breadcrumb, record.kind.name());
            }
            Ok(())
        }
    }
}

fn status(rt: &Runtime, format: OutputFormat) -> Result<()> {
    let tallies = rt.log.tally_all()?;
    match format {
        OutputFormat::Json => print_json(&tallies),
        OutputFormat::Plain => {
            println!("{} runners registered: {}", RUNNER_NAMES.len(), RUNNER_NAMES.join(", "));
            println!("event log: {} unique event types, {} total", tallies.event_tallies.len(), tallies.event_tallies.values().sum::<u64>());
            Ok(())
        }
    }
}
