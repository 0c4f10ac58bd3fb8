use anyhow::Result;
use serde::Serialize;

use crate::args::OutputFormat;
use crate::runtime::{print_json, Runtime};

#[derive(Serialize)]
struct ContextReport {
    session_id: Option<String>,
    cycle: u64,
    compaction_count: u64,
    auto_mode: AutoModeView,
    active_tasks: Vec<(String, String)>,
    delegations_this_drive: usize,
}

#[derive(Serialize)]
struct AutoModeView {
    enabled: bool,
    source: String,
    confidence: f64,
}

/// The reconstructed session operational state (spec §3.6, §4.3): cycle,
/// compaction count, auto-mode, active tasks, delegation tally — everything
/// a recovery message needs, assembled without emitting any event.
pub fn handle(rt: &Runtime, format: OutputFormat) -> Result<()> {
    let session_id = rt.current_session_id()?;
    let session_ref = session_id.as_deref();

    let cycle = macf_projections::cycle_number(&rt.log)?;
    let compaction_count = macf_projections::compaction_count(&rt.log, session_ref)?;
    let auto_mode = macf_projections::auto_mode(&rt.log, session_ref)?;
    let delegations = macf_projections::delegations_this_drive(&rt.log, session_ref)?;

    let active_tasks = match &session_id {
        Some(sid) => {
            let dir = rt.session_tasks_dir(sid);
            macf_projections::active_tasks_from_filesystem(&dir)?
        }
        None => Default::default(),
    };

    let report = ContextReport {
        session_id,
        cycle,
        compaction_count,
        auto_mode: AutoModeView {
            enabled: auto_mode.enabled,
            source: format!("{:?}", auto_mode.source),
            confidence: auto_mode.confidence,
        },
        active_tasks: active_tasks.into_iter().map(|(id, t)| (id, format!("{t:?}"))).collect(),
        delegations_this_drive: delegations.len(),
    };

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Plain => {
            println!("session:      {}", report.session_id.as_deref().unwrap_or("-"));
            println!("cycle:        {}", report.cycle);
            println!("compactions:  {}", report.compaction_count);
            println!(
                "auto_mode:    enabled={} source={} confidence={:.2}",
                report.auto_mode.enabled, report.auto_mode.source, report.auto_mode.confidence
            );
            println!("active tasks: {}", report.active_tasks.len());
            for (id, task_type) in &report.active_tasks {
                println!("  {id} [{task_type}]");
            }
            println!("delegations this drive: {}", report.delegations_this_drive);
        }
    }
    Ok(())
}
