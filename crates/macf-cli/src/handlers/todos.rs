use std::io::Read as _;

use anyhow::Result;
use macf_types::EventKind;
use serde_json::Value;

use crate::args::{OutputFormat, TodosCommand};
use crate::runtime::{print_json, Runtime};

/// Todo *data* is owned by the host agent (spec GLOSSARY); this crate only
/// stores the append-only history of `todos_*` events. Write subcommands
/// read a JSON payload from stdin and append the matching event kind.
pub fn handle(rt: &Runtime, command: TodosCommand, format: OutputFormat) -> Result<()> {
    match command {
        TodosCommand::List { page, filter } => list(rt, page, &filter, format),
        TodosCommand::Status => status(rt, format),
        TodosCommand::AuthCollapse => record(rt, "todos_auth_collapse", EventKind::TodosAuthCollapse),
        TodosCommand::AuthRestore => record(rt, "todos_auth_restore", EventKind::TodosAuthRestore),
        TodosCommand::AuthItemEdit => record(rt, "todos_auth_item_edit", EventKind::TodosAuthItemEdit),
        TodosCommand::AuthStatus => status(rt, format),
    }
}

fn latest_todos_updated(rt: &Runtime) -> Result<Option<Value>> {
    for record in rt.log.read_all()?.into_iter().rev() {
        if let EventKind::TodosUpdated(data) = record.kind {
            return Ok(Some(data));
        }
    }
    Ok(None)
}

fn list(rt: &Runtime, page: Option<usize>, filter: &str, format: OutputFormat) -> Result<()> {
    let data = latest_todos_updated(rt)?.unwrap_or(Value::Array(Vec::new()));
    let items: Vec<Value> = match &data {
        Value::Array(items) => items.clone(),
        Value::Object(map) => map.get("todos").and_then(|v| v.as_array()).cloned().unwrap_or_default(),
        _ => Vec::new(),
    };
    let filtered: Vec<Value> = if filter == "all" {
        items
    } else {
        items.into_iter().filter(|item| item.to_string().contains(filter)).collect()
    };
    let page_size = 10;
    let selected: Vec<Value> = match page {
        Some(p) => filtered.into_iter().skip(p.saturating_sub(1) * page_size).take(page_size).collect(),
        None => filtered,
    };
    match format {
        OutputFormat::Json => print_json(&selected),
        OutputFormat::Plain => {
            for item in &selected {
                println!("{item}");
            }
            Ok(())
        }
    }
}

fn status(rt: &Runtime, format: OutputFormat) -> Result<()> {
    let mut last: Option<(f64, &'static str)> = None;
    for record in rt.log.read_all()? {
        let name = match &record.kind {
            EventKind::TodosUpdated(_) => "todos_updated",
            EventKind::TodosAuthCollapse(_) => "todos_auth_collapse",
            EventKind::TodosAuthRestore(_) => "todos_auth_restore",
            EventKind::TodosAuthItemEdit(_) => "todos_auth_item_edit",
            _ => continue,
        };
        last = Some((record.timestamp, name));
    }
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "last_event": last.map(|(_, name)| name),
            "last_timestamp": last.map(|(ts, _)| ts),
        })),
        OutputFormat::Plain => {
            match last {
                Some((ts, name)) => println!("{name} at {ts}"),
                None => println!("no todos activity recorded"),
            }
            Ok(())
        }
    }
}

fn record(rt: &Runtime, label: &str, kind_fn: fn(Value) -> EventKind) -> Result<()> {
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf).ok();
    let payload: Value = if buf.trim().is_empty() { Value::Null } else { serde_json::from_str(&buf)? };
    let session_id = rt.current_session_id()?.unwrap_or_else(|| "unknown".to_string());
    let breadcrumb = rt.mint_breadcrumb(&session_id, None);
    rt.log.append(&breadcrumb, kind_fn(payload), None);
    println!("recorded {label}");
    Ok(())
}
