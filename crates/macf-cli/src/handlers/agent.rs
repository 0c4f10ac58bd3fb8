use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use macf_backup::{create_archive, read_manifest, restore, verify, RestoreOptions, SourceFile, TransplantMapping};

use crate::args::{AgentCommand, BackupCommand, OutputFormat, RestoreCommand};
use crate::runtime::{default_backup_dir, print_json, Runtime};

pub fn handle(rt: &Runtime, command: AgentCommand, format: OutputFormat) -> Result<()> {
    match command {
        AgentCommand::Init => init(rt),
        AgentCommand::Backup { command } => backup(rt, command, format),
        AgentCommand::Restore { command } => restore_cmd(rt, command, format),
    }
}

/// Scaffold the directories the rest of the workspace assumes exist: the
/// `.macf` runtime state dir, the policy layer dirs, and the tasks root.
fn init(rt: &Runtime) -> Result<()> {
    for dir in [rt.macf_dir(), rt.base_policies_dir(), rt.project_policies_dir(), rt.tasks_root(), default_backup_dir(&rt.project_root)] {
        std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    if !rt.log.path().exists() {
        if let Some(parent) = rt.log.path().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(rt.log.path(), b"")?;
    }
    println!("initialized macf workspace at {}", rt.project_root.display());
    Ok(())
}

fn backup(rt: &Runtime, command: BackupCommand, format: OutputFormat) -> Result<()> {
    match command {
        BackupCommand::Create { output } => {
            let backup_dir = default_backup_dir(&rt.project_root);
            std::fs::create_dir_all(&backup_dir)?;
            let output = output.unwrap_or_else(|| backup_dir.join(default_archive_name()));
            let sources = collect_sources(rt)?;
            let manifest = create_archive(&sources, &output)?;
            println!("wrote {} ({} files)", output.display(), manifest.entries.len());
            Ok(())
        }
        BackupCommand::List => {
            let backup_dir = default_backup_dir(&rt.project_root);
            let mut archives: Vec<PathBuf> = std::fs::read_dir(&backup_dir)
                .into_iter()
                .flatten()
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("xz"))
                .collect();
            archives.sort();
            match format {
                OutputFormat::Json => print_json(&archives.iter().map(|p| p.display().to_string()).collect::<Vec<_>>()),
                OutputFormat::Plain => {
                    for archive in &archives {
                        println!("{}", archive.display());
                    }
                    Ok(())
                }
            }
        }
        BackupCommand::Info { archive } => {
            let manifest = read_manifest(&archive)?;
            match format {
                OutputFormat::Json => print_json(&manifest),
                OutputFormat::Plain => {
                    for entry in &manifest.entries {
                        println!("{} ({} bytes, {})", entry.archive_path, entry.size_bytes, entry.category);
                    }
                    Ok(())
                }
            }
        }
    }
}

fn restore_cmd(rt: &Runtime, command: RestoreCommand, format: OutputFormat) -> Result<()> {
    match command {
        RestoreCommand::Verify { archive, target } => {
            let manifest = read_manifest(&archive)?;
            let target = target.unwrap_or_else(|| rt.project_root.clone());
            let report = verify(&manifest, &target);
            match format {
                OutputFormat::Json => print_json(&report),
                OutputFormat::Plain => {
                    println!("ok: {}", report.is_ok());
                    for m in &report.missing {
                        println!("missing: {m}");
                    }
                    for m in &report.corrupted {
                        println!("corrupted: {m}");
                    }
                    for m in &report.broken_symlinks {
                        println!("broken symlink (warning): {m}");
                    }
                    Ok(())
                }
            }
        }
        RestoreCommand::Install { archive, target, transplant, force, dry_run } => {
            let target = target.unwrap_or_else(|| rt.project_root.clone());
            let mapping = transplant.then(|| {
                let home = dirs::home_dir().unwrap_or_default();
                TransplantMapping::for_roots(&rt.project_root, &target, &home, &home)
            });
            let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
            let report = restore(&archive, &target, RestoreOptions { force, dry_run, transplant: mapping }, &timestamp)?;
            match format {
                OutputFormat::Json => print_json(&report),
                OutputFormat::Plain => {
                    println!("restored to {}", report.extracted_to.display());
                    if let Some(checkpoint) = &report.checkpoint_path {
                        println!("checkpointed previous contents to {}", checkpoint.display());
                    }
                    println!("verify ok: {}", report.verify.is_ok());
                    Ok(())
                }
            }
        }
    }
}

fn default_archive_name() -> String {
    format!("macf-backup-{}.tar.xz", chrono::Utc::now().format("%Y%m%dT%H%M%SZ"))
}

/// Gather the files that constitute a consciousness: the event log, the
/// task store, the policy layer, and the host's `.claude` settings.
fn collect_sources(rt: &Runtime) -> Result<Vec<SourceFile>> {
    let mut sources = Vec::new();
    if rt.log.path().exists() {
        sources.push(SourceFile::new(rt.log.path(), ".macf/agent_events_log.jsonl", "events", true));
    }
    add_tree(&mut sources, &rt.tasks_root(), &rt.project_root, "tasks", false)?;
    add_tree(&mut sources, &rt.macf_dir().join("policy"), &rt.project_root, "policy", false)?;
    let settings = rt.claude_settings_path();
    if settings.exists() {
        sources.push(SourceFile::new(&settings, ".claude/settings.local.json", "config", true));
    }
    Ok(sources)
}

fn add_tree(sources: &mut Vec<SourceFile>, dir: &Path, project_root: &Path, category: &str, critical: bool) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    for entry in walkdir::WalkDir::new(dir).into_iter().filter_map(std::result::Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(project_root).unwrap_or(entry.path());
        sources.push(SourceFile::new(entry.path(), relative.to_string_lossy().into_owned(), category, critical));
    }
    Ok(())
}
