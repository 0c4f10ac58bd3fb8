//! `user_prompt_submit` (spec §4.6): mints the turn's prompt_uuid-bearing
//! breadcrumb, emits `dev_drv_started`, and injects temporal + policy
//! context.

use macf_types::event::DevDrvStartedData;
use macf_types::hook::UserPromptSubmitInput;
use macf_types::{EventKind, HookOutput};

use crate::context::HookContext;

pub fn run(input: &UserPromptSubmitInput, ctx: &HookContext, search_daemon_addr: &str) -> HookOutput {
    let cycle = macf_projections::cycle_number(&ctx.log).unwrap_or(0);
    let prompt_uuid = input.prompt_uuid.clone().unwrap_or_else(|| fallback_prompt_uuid(ctx, &input.session_id));
    let breadcrumb = macf_eventlog::mint(cycle, &input.session_id, Some(&prompt_uuid), &ctx.project_root);

    ctx.emit(
        &breadcrumb,
        EventKind::DevDrvStarted(DevDrvStartedData {
            prompt_uuid: prompt_uuid.clone(),
            extra: Default::default(),
        }),
    );

    let policy_injection = macf_search_daemon::client::get_policy_injection(search_daemon_addr, &input.prompt);
    let mut context = format!("Cycle: {cycle}\nPrompt: {prompt_uuid}");
    if !policy_injection.is_empty() {
        context.push_str("\n\n");
        context.push_str(&policy_injection);
    }
    HookOutput::allow().with_additional_context(context)
}

/// Recover a prompt_uuid when the host didn't supply one directly, by
/// scanning the session's own transcript tail (spec §4.4).
fn fallback_prompt_uuid(ctx: &HookContext, session_id: &str) -> String {
    ctx.host_transcript_dir()
        .and_then(|dir| macf_projections::last_user_prompt_uuid(&dir.join(format!("{session_id}.jsonl"))).ok().flatten())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn emits_dev_drv_started_with_the_given_prompt_uuid() {
        let dir = tempdir().unwrap();
        let ctx = HookContext::new(dir.path(), dir.path().join("events.jsonl"), false);
        let input = UserPromptSubmitInput {
            session_id: "sess".to_string(),
            prompt: "short".to_string(),
            prompt_uuid: Some("p-1".to_string()),
        };
        let output = run(&input, &ctx, "127.0.0.1:1");
        assert!(output.continue_);
        let records = ctx.log.read_all().unwrap();
        assert_eq!(records[0].event_name(), "dev_drv_started");
    }
}
