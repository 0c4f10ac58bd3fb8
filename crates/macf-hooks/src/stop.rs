//! `stop` (spec §4.6): emits `dev_drv_ended` with the drive's duration and
//! injects a DEV_DRV stats summary.

use macf_types::event::DevDrvEndedData;
use macf_types::hook::StopInput;
use macf_types::{Breadcrumb, EventKind, HookOutput};

use crate::context::HookContext;

pub fn run(input: &StopInput, ctx: &HookContext, cycle: u64) -> HookOutput {
    let breadcrumb = Breadcrumb::new(cycle, &input.session_id);
    let stats = macf_projections::dev_drv_stats(&ctx.log, Some(&input.session_id)).unwrap_or_default();

    let prompt_uuid = stats.current_prompt_uuid.clone().unwrap_or_else(|| "unknown".to_string());
    let started_at = macf_projections::last_session_end_time(&ctx.log).unwrap_or(None).unwrap_or(0.0);
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    let duration_seconds = (now - started_at).max(0.0);

    ctx.emit(&breadcrumb, EventKind::DevDrvEnded(DevDrvEndedData { prompt_uuid, duration_seconds }));

    HookOutput::allow().with_additional_context(format!(
        "DEV_DRV stats: count={} total_duration={:.1}s",
        stats.count, stats.total_duration
    ))
}
