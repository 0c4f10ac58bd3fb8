use anyhow::Result;
use serde::Serialize;

use crate::args::OutputFormat;
use crate::runtime::Runtime;

#[derive(Serialize)]
struct EnvReport {
    project_root: String,
    events_log_path: String,
    tasks_root: String,
    agent_user: Option<String>,
    auto_mode_env_override: Option<bool>,
    backup_dir: Option<String>,
    backup_keep: Option<u32>,
    timezone: Option<String>,
    templates_dir: Option<String>,
    maceff_root: Option<String>,
    proxy_capture_dir: Option<String>,
}

pub fn handle(rt: &Runtime, format: OutputFormat) -> Result<()> {
    let backup = macf_core::env::backup_config();
    let report = EnvReport {
        project_root: rt.project_root.display().to_string(),
        events_log_path: rt.log.path().display().to_string(),
        tasks_root: rt.tasks_root().display().to_string(),
        agent_user: macf_core::env::agent_user(),
        auto_mode_env_override: macf_core::env::auto_mode_env_override(),
        backup_dir: backup.dir.map(|p| p.display().to_string()),
        backup_keep: backup.keep,
        timezone: macf_core::env::timezone(),
        templates_dir: macf_core::env::templates_dir().map(|p| p.display().to_string()),
        maceff_root: macf_core::env::maceff_root().map(|p| p.display().to_string()),
        proxy_capture_dir: macf_core::env::proxy_capture_dir().map(|p| p.display().to_string()),
    };

    match format {
        OutputFormat::Json => crate::runtime::print_json(&report)?,
        OutputFormat::Plain => {
            println!("project_root:        {}", report.project_root);
            println!("events_log_path:     {}", report.events_log_path);
            println!("tasks_root:          {}", report.tasks_root);
            println!("agent_user:          {}", report.agent_user.as_deref().unwrap_or("-"));
            println!("auto_mode_env:       {:?}", report.auto_mode_env_override);
            println!("backup_dir:          {}", report.backup_dir.as_deref().unwrap_or("-"));
            println!("timezone:            {}", report.timezone.as_deref().unwrap_or("-"));
        }
    }
    Ok(())
}
