//! The four bookkeeping-only runners (spec §4.6): no injection, just an
//! event log entry for the corresponding host event.

use macf_types::event::SessionEndedData;
use macf_types::hook::{NotificationInput, PermissionRequestInput, PreCompactInput, SessionEndInput};
use macf_types::{Breadcrumb, EventKind, HookOutput};

use crate::context::HookContext;

pub fn session_end(input: &SessionEndInput, ctx: &HookContext, cycle: u64) -> HookOutput {
    let breadcrumb = Breadcrumb::new(cycle, &input.session_id);
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    ctx.emit(
        &breadcrumb,
        EventKind::SessionEnded(SessionEndedData {
            session_id: input.session_id.clone(),
            timestamp,
            extra: Default::default(),
        }),
    );
    HookOutput::allow()
}

pub fn pre_compact(input: &PreCompactInput, ctx: &HookContext, cycle: u64) -> HookOutput {
    let breadcrumb = Breadcrumb::new(cycle, &input.session_id);
    ctx.emit(
        &breadcrumb,
        EventKind::CliCommandInvoked(macf_types::event::CliCommandData {
            command: "pre_compact".to_string(),
            args: Vec::new(),
        }),
    );
    HookOutput::allow()
}

pub fn permission_request(input: &PermissionRequestInput, ctx: &HookContext, cycle: u64) -> HookOutput {
    let breadcrumb = Breadcrumb::new(cycle, &input.session_id);
    ctx.emit(
        &breadcrumb,
        EventKind::CliCommandInvoked(macf_types::event::CliCommandData {
            command: "permission_request".to_string(),
            args: vec![input.tool_name.clone()],
        }),
    );
    HookOutput::allow()
}

pub fn notification(input: &NotificationInput, ctx: &HookContext, cycle: u64) -> HookOutput {
    let breadcrumb = Breadcrumb::new(cycle, &input.session_id);
    ctx.emit(
        &breadcrumb,
        EventKind::CliCommandInvoked(macf_types::event::CliCommandData {
            command: "notification".to_string(),
            args: input.message.clone().into_iter().collect(),
        }),
    );
    HookOutput::allow()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn session_end_emits_session_ended() {
        let dir = tempdir().unwrap();
        let ctx = HookContext::new(dir.path(), dir.path().join("events.jsonl"), false);
        let input = SessionEndInput { session_id: "s".to_string() };
        let output = session_end(&input, &ctx, 1);
        assert!(output.continue_);
        assert_eq!(ctx.log.read_all().unwrap()[0].event_name(), "session_ended");
    }
}
