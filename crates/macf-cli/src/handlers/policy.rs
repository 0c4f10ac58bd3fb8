use anyhow::{Context, Result};
use macf_policy::{find_policy_file, hybrid_search, Database};
use macf_types::TaskType;

use crate::args::{OutputFormat, PolicyCommand};
use crate::runtime::{print_json, Runtime};

pub fn handle(rt: &Runtime, command: PolicyCommand, format: OutputFormat) -> Result<()> {
    match command {
        PolicyCommand::Manifest => {
            let manifest = rt.load_manifest()?;
            print_json(&manifest)
        }
        PolicyCommand::Search { keywords } => search(rt, &keywords, format),
        PolicyCommand::Navigate { name } => navigate(rt, &name, format),
        PolicyCommand::Read { name, lines, section } => read(rt, &name, lines.as_deref(), section),
        PolicyCommand::List => list(rt, format),
        PolicyCommand::CaTypes => ca_types(format),
        PolicyCommand::Recommend { question } => search(rt, &question, format),
        PolicyCommand::BuildIndex => build_index(rt),
    }
}

fn search(rt: &Runtime, query: &str, format: OutputFormat) -> Result<()> {
    let manifest = rt.load_manifest()?;
    let db = open_index(rt, &manifest)?;
    let results = hybrid_search(&db, &manifest)(query)?;
    match format {
        OutputFormat::Json => print_json(&results.iter().map(result_json).collect::<Vec<_>>()),
        OutputFormat::Plain => {
            for result in &results {
                println!("{} [{:?}] score={:.4}", result.policy_name, result.confidence, result.score);
            }
            Ok(())
        }
    }
}

fn result_json(result: &macf_policy::SearchResult) -> serde_json::Value {
    serde_json::json!({
        "policy_name": result.policy_name,
        "score": result.score,
        "confidence": format!("{:?}", result.confidence),
        "explanations": result.explanations,
    })
}

fn navigate(rt: &Runtime, name: &str, format: OutputFormat) -> Result<()> {
    let manifest = rt.load_manifest()?;
    let entry = manifest.policies.iter().find(|p| p.name == name).with_context(|| format!("no policy named {name}"))?;
    match format {
        OutputFormat::Json => print_json(entry),
        OutputFormat::Plain => {
            println!("name: {}", entry.name);
            println!("layer: {}", entry.layer);
            println!("languages: {:?}", entry.languages);
            println!("consciousness: {:?}", entry.consciousness);
            println!("keywords: {:?}", entry.keywords);
            Ok(())
        }
    }
}

fn read(rt: &Runtime, name: &str, lines: Option<&str>, section: Option<usize>) -> Result<()> {
    let body = match find_policy_file(name, &rt.project_policies_dir(), &rt.base_policies_dir()) {
        Some(path) => std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?,
        None => {
            let manifest = rt.load_manifest()?;
            manifest.policies.iter().find(|p| p.name == name).map(|p| p.body.clone()).with_context(|| format!("no policy named {name}"))?
        }
    };

    let selected = if let Some(range) = lines {
        slice_lines(&body, range)
    } else if let Some(section_index) = section {
        slice_section(&body, section_index)
    } else {
        body
    };
    println!("{selected}");
    Ok(())
}

fn slice_lines(body: &str, range: &str) -> String {
    let Some((start, end)) = range.split_once(':') else { return body.to_string() };
    let (Ok(start), Ok(end)) = (start.parse::<usize>(), end.parse::<usize>()) else { return body.to_string() };
    body.lines().skip(start.saturating_sub(1)).take(end.saturating_sub(start).saturating_add(1)).collect::<Vec<_>>().join("\n")
}

/// A "section" is a `#`-headed markdown block, 1-indexed in document order.
fn slice_section(body: &str, section_index: usize) -> String {
    let mut sections: Vec<String> = Vec::new();
    let mut current = String::new();
    for line in body.lines() {
        if line.starts_with('#') && !current.is_empty() {
            sections.push(std::mem::take(&mut current));
        }
        current.push_str(line);
        current.push('\n');
    }
    if !current.is_empty() {
        sections.push(current);
    }
    sections.into_iter().nth(section_index.saturating_sub(1)).unwrap_or_else(|| body.to_string())
}

fn list(rt: &Runtime, format: OutputFormat) -> Result<()> {
    let manifest = rt.load_manifest()?;
    let names: Vec<&str> = manifest.visible_policies().into_iter().map(|p| p.name.as_str()).collect();
    match format {
        OutputFormat::Json => print_json(&names),
        OutputFormat::Plain => {
            for name in &names {
                println!("{name}");
            }
            Ok(())
        }
    }
}

fn ca_types(format: OutputFormat) -> Result<()> {
    let names = [
        TaskType::Mission,
        TaskType::Experiment,
        TaskType::Detour,
        TaskType::Phase,
        TaskType::Bug,
        TaskType::Task,
        TaskType::DelegPlan,
        TaskType::Subplan,
        TaskType::Archive,
        TaskType::GhIssue,
    ];
    match format {
        OutputFormat::Json => print_json(&names),
        OutputFormat::Plain => {
            for name in &names {
                println!("{name:?}");
            }
            Ok(())
        }
    }
}

fn build_index(rt: &Runtime) -> Result<()> {
    let manifest = rt.load_manifest()?;
    let mut db = Database::open(&rt.policy_db_path())?;
    db.build_index(&manifest)?;
    println!("built policy index at {} ({} policies)", rt.policy_db_path().display(), manifest.policies.len());
    Ok(())
}

fn open_index(rt: &Runtime, manifest: &macf_types::Manifest) -> Result<Database> {
    let path = rt.policy_db_path();
    if path.exists() {
        return Ok(Database::open(&path)?);
    }
    let mut db = Database::open_in_memory()?;
    db.build_index(manifest)?;
    Ok(db)
}
