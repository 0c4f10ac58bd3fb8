use std::collections::{BTreeMap, BTreeSet};

use anyhow::{bail, Context, Result};
use macf_tasks::{check_grant_in_events, emit_grant_cleared, GrantOp};
use macf_types::{Task, TaskMetadata, TaskStatus, TaskType};

use crate::args::{OutputFormat, TaskCommand};
use crate::runtime::{print_json, Runtime};

pub fn handle(rt: &Runtime, command: TaskCommand, format: OutputFormat) -> Result<()> {
    let store = rt.task_store_for_current_session()?;
    match command {
        TaskCommand::List => list(&store, format),
        TaskCommand::Get { id } => get(&store, &id, format),
        TaskCommand::Tree { id } => tree(&store, &id, format),
        TaskCommand::Edit { id, field, value } => edit(rt, &store, &id, &field, &value, format),
        TaskCommand::EditMtmd { id, field, value } => edit_mtmd(rt, &store, &id, &field, &value, format),
        TaskCommand::AddMtmd { id, key, value } => add_mtmd(rt, &store, &id, &key, &value, format),
    }
}

/// Spec §4.5's grant escape hatch: before any mutating operation, look for
/// a matching `task_grant_{op}` not yet superseded by its `_cleared`
/// variant. No match is a protection violation (§7) — exit 1 with a hint,
/// no event emitted. A match lets the operation proceed and clears the
/// grant so it can't be reused.
fn require_grant(rt: &Runtime, op: GrantOp, id: &str, field: Option<&str>, value: Option<&serde_json::Value>) -> Result<()> {
    let task_ids: BTreeSet<String> = std::iter::once(id.to_string()).collect();
    if !check_grant_in_events(&rt.log, op, &task_ids, field, value) {
        bail!("{}", grant_hint(op, id, field));
    }
    let session_id = rt.current_session_id()?.context("no current session id found in the event log")?;
    let breadcrumb = rt.mint_breadcrumb(&session_id, None);
    emit_grant_cleared(&rt.log, &breadcrumb, op, &task_ids);
    Ok(())
}

fn grant_hint(op: GrantOp, id: &str, field: Option<&str>) -> String {
    let event_name = match op {
        GrantOp::Update => "task_grant_update",
        GrantOp::Delete => "task_grant_delete",
        GrantOp::Create => "task_grant_create",
    };
    match field {
        Some(field) => format!(
            "task {id} is protected: append a `{event_name}` event with task_ids=[\"{id}\"] and field=\"{field}\" (matching this edit's value) before retrying"
        ),
        None => format!("task {id} is protected: append a `{event_name}` event with task_ids=[\"{id}\"] before retrying"),
    }
}

fn list(store: &macf_tasks::TaskStore, format: OutputFormat) -> Result<()> {
    let tasks = store.read_all()?;
    match format {
        OutputFormat::Json => print_json(&tasks),
        OutputFormat::Plain => {
            for task in &tasks {
                println!("{} [{:?}] {}", task.id, task.status, task.subject);
            }
            Ok(())
        }
    }
}

fn get(store: &macf_tasks::TaskStore, id: &str, format: OutputFormat) -> Result<()> {
    let task = store.read(id)?;
    match format {
        OutputFormat::Json => print_json(&task),
        OutputFormat::Plain => {
            println!("id: {}", task.id);
            println!("subject: {}", task.subject);
            println!("status: {:?}", task.status);
            println!("blocks: {:?}", task.blocks);
            println!("blockedBy: {:?}", task.blocked_by);
            Ok(())
        }
    }
}

fn tree(store: &macf_tasks::TaskStore, id: &str, format: OutputFormat) -> Result<()> {
    let tasks = store.read_all()?;
    let mut children: BTreeMap<String, Vec<&Task>> = BTreeMap::new();
    for task in &tasks {
        if let Ok(Some(metadata)) = task.metadata() {
            if let Some(parent_id) = metadata.parent_id {
                children.entry(parent_id).or_default().push(task);
            }
        }
    }
    let root = store.read(id)?;
    match format {
        OutputFormat::Json => {
            let rendered = render_tree_json(&root, &children);
            print_json(&rendered)
        }
        OutputFormat::Plain => {
            print_tree_plain(&root, &children, 0);
            Ok(())
        }
    }
}

fn render_tree_json(task: &Task, children: &BTreeMap<String, Vec<&Task>>) -> serde_json::Value {
    let kids: Vec<serde_json::Value> = children.get(&task.id).into_iter().flatten().map(|child| render_tree_json(child, children)).collect();
    serde_json::json!({ "id": task.id, "subject": task.subject, "status": format!("{:?}", task.status), "children": kids })
}

fn print_tree_plain(task: &Task, children: &BTreeMap<String, Vec<&Task>>, depth: usize) {
    println!("{}{} [{:?}] {}", "  ".repeat(depth), task.id, task.status, task.subject);
    for child in children.get(&task.id).into_iter().flatten() {
        print_tree_plain(child, children, depth + 1);
    }
}

fn edit(rt: &Runtime, store: &macf_tasks::TaskStore, id: &str, field: &str, value: &str, format: OutputFormat) -> Result<()> {
    if !matches!(field, "subject" | "description" | "activeForm" | "status") {
        bail!("unknown task field: {field}");
    }
    let status = if field == "status" { Some(parse_status(value)?) } else { None };
    require_grant(rt, GrantOp::Update, id, Some(field), Some(&serde_json::Value::String(value.to_string())))?;
    let task = store.update(id, |task| match field {
        "subject" => task.subject = value.to_string(),
        "description" => task.description = value.to_string(),
        "activeForm" => task.active_form = value.to_string(),
        "status" => task.status = status.expect("validated above"),
        _ => unreachable!(),
    })?;
    render_task(&task, format)
}

fn parse_status(value: &str) -> Result<TaskStatus> {
    Ok(match value {
        "pending" => TaskStatus::Pending,
        "in_progress" => TaskStatus::InProgress,
        "completed" => TaskStatus::Completed,
        "archived" => TaskStatus::Archived,
        other => bail!("unknown task status: {other}"),
    })
}

fn edit_mtmd(rt: &Runtime, store: &macf_tasks::TaskStore, id: &str, field: &str, value: &str, format: OutputFormat) -> Result<()> {
    require_grant(rt, GrantOp::Update, id, Some(field), Some(&serde_json::Value::String(value.to_string())))?;
    let task = store.update(id, |task| {
        let mut metadata = task.metadata().ok().flatten().unwrap_or_default();
        apply_metadata_field(&mut metadata, field, value);
        if let Ok(description) = metadata.upsert_into(&task.description) {
            task.description = description;
        }
    })?;
    render_task(&task, format)
}

fn apply_metadata_field(metadata: &mut TaskMetadata, field: &str, value: &str) {
    match field {
        "task_type" => metadata.task_type = parse_task_type(value),
        "creation_breadcrumb" => metadata.creation_breadcrumb = Some(value.to_string()),
        "created_by" => metadata.created_by = Some(value.to_string()),
        "parent_id" => metadata.parent_id = Some(value.to_string()),
        "plan_ca_ref" => metadata.plan_ca_ref = Some(value.to_string()),
        "repo" => metadata.repo = Some(value.to_string()),
        "target_version" => metadata.target_version = Some(value.to_string()),
        "completion_breadcrumb" => metadata.completion_breadcrumb = Some(value.to_string()),
        "archived" => metadata.archived = value == "true",
        "archived_at" => metadata.archived_at = Some(value.to_string()),
        _ => {}
    }
}

fn parse_task_type(value: &str) -> Option<TaskType> {
    match value.to_uppercase().as_str() {
        "MISSION" => Some(TaskType::Mission),
        "EXPERIMENT" => Some(TaskType::Experiment),
        "DETOUR" => Some(TaskType::Detour),
        "PHASE" => Some(TaskType::Phase),
        "BUG" => Some(TaskType::Bug),
        "TASK" => Some(TaskType::Task),
        "DELEG_PLAN" => Some(TaskType::DelegPlan),
        "SUBPLAN" => Some(TaskType::Subplan),
        "ARCHIVE" => Some(TaskType::Archive),
        "GH_ISSUE" => Some(TaskType::GhIssue),
        "SENTINEL" => Some(TaskType::Sentinel),
        _ => None,
    }
}

fn add_mtmd(rt: &Runtime, store: &macf_tasks::TaskStore, id: &str, key: &str, value: &str, format: OutputFormat) -> Result<()> {
    require_grant(rt, GrantOp::Update, id, Some(key), Some(&serde_json::Value::String(value.to_string())))?;
    let task = store.update(id, |task| {
        let mut metadata = task.metadata().ok().flatten().unwrap_or_default();
        metadata.custom.insert(key.to_string(), serde_json::Value::String(value.to_string()));
        if let Ok(description) = metadata.upsert_into(&task.description) {
            task.description = description;
        }
    })?;
    render_task(&task, format)
}

fn render_task(task: &Task, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(task),
        OutputFormat::Plain => {
            println!("{} updated", task.id);
            Ok(())
        }
    }
}
