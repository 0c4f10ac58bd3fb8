//! `subagent_stop` (spec §4.6): emits `delegation_completed` and
//! `deleg_drv_ended`, and injects DELEG_DRV stats.

use macf_types::event::{DelegDrvEndedData, DelegationCompletedData};
use macf_types::hook::SubagentStopInput;
use macf_types::{Breadcrumb, EventKind, HookOutput};

use crate::context::HookContext;

pub fn run(input: &SubagentStopInput, ctx: &HookContext, cycle: u64) -> HookOutput {
    let breadcrumb = Breadcrumb::new(cycle, &input.session_id);
    let subagent_type = input.subagent_type.clone().unwrap_or_else(|| "unknown".to_string());

    // The host's subagent_stop payload carries no timing or outcome data;
    // derive duration from the matching delegation_started, and treat
    // reaching this hook at all as success (the host doesn't report failure).
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    let started_at =
        macf_projections::pending_delegation_started_at(&ctx.log, Some(&input.session_id), &subagent_type)
            .ok()
            .flatten();
    let duration_seconds = started_at.map(|t| (now - t).max(0.0)).unwrap_or(0.0);
    let success = true;

    ctx.emit(
        &breadcrumb,
        EventKind::DelegationCompleted(DelegationCompletedData { subagent_type: subagent_type.clone(), success }),
    );
    ctx.emit(&breadcrumb, EventKind::DelegDrvEnded(DelegDrvEndedData { subagent_type, duration_seconds }));

    let stats = macf_projections::deleg_drv_stats(&ctx.log, Some(&input.session_id)).unwrap_or_default();
    HookOutput::allow().with_additional_context(format!(
        "DELEG_DRV stats: delegations={} total_duration={:.1}s",
        stats.subagent_types.len(),
        stats.total_duration
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use macf_types::event::DelegationStartedData;
    use tempfile::tempdir;

    #[test]
    fn derives_duration_from_the_matching_delegation_started() {
        let dir = tempdir().unwrap();
        let ctx = HookContext::new(dir.path(), dir.path().join("events.jsonl"), false);
        let breadcrumb = Breadcrumb::new(1, "sess1234");
        ctx.emit(
            &breadcrumb,
            EventKind::DelegationStarted(DelegationStartedData { subagent_type: "researcher".to_string(), description: None }),
        );

        let input = SubagentStopInput { session_id: "sess1234".to_string(), subagent_type: Some("researcher".to_string()) };
        let output = run(&input, &ctx, 1);

        assert!(output.continue_);
        let records = ctx.log.read_all().unwrap();
        assert_eq!(records[1].event_name(), "delegation_completed");
        assert_eq!(records[2].event_name(), "deleg_drv_ended");
    }
}
