//! Shared CLI runtime: resolved project root, event log handle, and the
//! policy manifest paths every handler needs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use macf_eventlog::EventLog;
use macf_types::Manifest;

pub struct Runtime {
    pub project_root: PathBuf,
    pub log: EventLog,
}

impl Runtime {
    pub fn open(project_root_arg: Option<&str>) -> Result<Self> {
        let project_root = macf_core::path::resolve_project_root(project_root_arg)?;
        let events_log_path = macf_core::path::resolve_events_log_path(&project_root, None);
        Ok(Self { project_root, log: EventLog::new(events_log_path) })
    }

    pub fn macf_dir(&self) -> PathBuf {
        self.project_root.join(".macf")
    }

    pub fn base_manifest_path(&self) -> PathBuf {
        self.macf_dir().join("policy").join("base.toml")
    }

    pub fn project_manifest_path(&self) -> PathBuf {
        self.macf_dir().join("policy").join("project.toml")
    }

    pub fn base_policies_dir(&self) -> PathBuf {
        self.macf_dir().join("policy").join("base")
    }

    pub fn project_policies_dir(&self) -> PathBuf {
        self.macf_dir().join("policy").join("project")
    }

    pub fn policy_db_path(&self) -> PathBuf {
        self.macf_dir().join("policy.sqlite")
    }

    pub fn claude_settings_path(&self) -> PathBuf {
        self.project_root.join(".claude").join("settings.local.json")
    }

    pub fn load_manifest(&self) -> Result<Manifest> {
        let overlay = self.project_manifest_path();
        let overlay = overlay.exists().then_some(overlay.as_path());
        macf_policy::load_merged_manifest(&self.base_manifest_path(), overlay)
            .context("loading merged policy manifest")
    }

    pub fn current_session_id(&self) -> Result<Option<String>> {
        let transcripts = macf_core::path::host_transcript_dir(&self.project_root).unwrap_or_else(|_| PathBuf::new());
        Ok(macf_projections::current_session_id(&self.log, &transcripts)?)
    }

    pub fn tasks_root(&self) -> PathBuf {
        macf_core::path::resolve_tasks_root(&self.project_root)
    }

    pub fn session_tasks_dir(&self, session_id: &str) -> PathBuf {
        self.tasks_root().join(session_id)
    }

    pub fn task_store_for_current_session(&self) -> Result<macf_tasks::TaskStore> {
        let session_id = self.current_session_id()?.context("no current session id found in the event log")?;
        Ok(macf_tasks::TaskStore::new(self.session_tasks_dir(&session_id)))
    }

    pub fn mint_breadcrumb(&self, session_id: &str, prompt_uuid: Option<&str>) -> macf_types::Breadcrumb {
        let cycle = macf_projections::cycle_number(&self.log).unwrap_or(0);
        macf_eventlog::mint(cycle, session_id, prompt_uuid, &self.project_root)
    }

    pub fn search_daemon_pid_path(&self) -> PathBuf {
        self.macf_dir().join("search-daemon.pid")
    }
}

pub fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn default_backup_dir(project_root: &Path) -> PathBuf {
    macf_core::env::backup_config().dir.unwrap_or_else(|| project_root.join(".macf").join("backups"))
}
