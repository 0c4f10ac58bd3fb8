//! `post_tool_use` (spec §4.6): emits `tool_call_completed` with sanitized
//! output.

use macf_types::event::ToolCallCompletedData;
use macf_types::hook::PostToolUseInput;
use macf_types::{Breadcrumb, EventKind, HookOutput};

use crate::context::HookContext;
use crate::sanitize::summarize_output;

pub fn run(input: &PostToolUseInput, ctx: &HookContext, cycle: u64) -> HookOutput {
    let breadcrumb = Breadcrumb::new(cycle, &input.session_id);
    let output_summary = summarize_output(&input.tool_response);

    ctx.emit(
        &breadcrumb,
        EventKind::ToolCallCompleted(ToolCallCompletedData {
            tool_name: input.tool_name.clone(),
            tool_call_id: input.tool_call_id.clone(),
            is_error: input.is_error,
            output_summary: output_summary.clone(),
        }),
    );

    HookOutput::allow().with_additional_context(format!("Tool result ({}): {}", input.tool_name, output_summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn emits_tool_call_completed_with_truncated_output() {
        let dir = tempdir().unwrap();
        let ctx = HookContext::new(dir.path(), dir.path().join("events.jsonl"), false);
        let input = PostToolUseInput {
            session_id: "s".to_string(),
            tool_name: "Bash".to_string(),
            tool_call_id: "1".to_string(),
            tool_input: json!({}),
            tool_response: json!("x".repeat(5000)),
            is_error: false,
        };
        run(&input, &ctx, 1);
        let records = ctx.log.read_all().unwrap();
        assert_eq!(records[0].event_name(), "tool_call_completed");
    }
}
