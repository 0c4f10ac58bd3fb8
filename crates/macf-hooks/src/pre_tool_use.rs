//! `pre_tool_use` (spec §4.6): emits `tool_call_started` (and
//! `delegation_started` for delegation tools), and mode-aware blocking of
//! bare `cd` commands — a `cd` alone in a `Bash` call never persists to the
//! next tool call, so AUTO-mode blocks it outright while MANUAL-mode only
//! warns.

use regex::Regex;
use std::sync::LazyLock;

use macf_types::event::{DelegationStartedData, ToolCallStartedData};
use macf_types::hook::PreToolUseInput;
use macf_types::{Breadcrumb, EventKind, HookOutput};

use crate::context::HookContext;

const DELEGATION_TOOL: &str = "Task";

static BARE_CD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*cd\b[^&|;]*$").unwrap());

pub fn run(input: &PreToolUseInput, ctx: &HookContext, cycle: u64, auto_mode: bool) -> HookOutput {
    let breadcrumb = Breadcrumb::new(cycle, &input.session_id);

    ctx.emit(
        &breadcrumb,
        EventKind::ToolCallStarted(ToolCallStartedData {
            tool_name: input.tool_name.clone(),
            tool_call_id: input.tool_call_id.clone(),
            extra: Default::default(),
        }),
    );

    if input.tool_name == DELEGATION_TOOL {
        let subagent_type = input.tool_input.get("subagent_type").and_then(|v| v.as_str()).unwrap_or("unknown").to_string();
        let description = input.tool_input.get("description").and_then(|v| v.as_str()).map(str::to_string);
        ctx.emit(&breadcrumb, EventKind::DelegationStarted(DelegationStartedData { subagent_type, description }));
    }

    if let Some(command) = bash_command(input) {
        if BARE_CD.is_match(&command) {
            return if auto_mode {
                HookOutput::block(
                    "Bare `cd` commands do not persist across tool calls in this environment; chain it with `&&` instead.",
                )
            } else {
                HookOutput::allow().with_system_message(
                    "Warning: a bare `cd` does not persist across tool calls; did you mean to chain it with `&&`?",
                )
            };
        }
    }

    HookOutput::allow().with_additional_context(format!("Tool: {}", input.tool_name))
}

fn bash_command(input: &PreToolUseInput) -> Option<String> {
    if input.tool_name != "Bash" {
        return None;
    }
    input.tool_input.get("command").and_then(|v| v.as_str()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn ctx(dir: &tempfile::TempDir) -> HookContext {
        HookContext::new(dir.path(), dir.path().join("events.jsonl"), false)
    }

    #[test]
    fn auto_mode_blocks_a_bare_cd() {
        let dir = tempdir().unwrap();
        let ctx = ctx(&dir);
        let input = PreToolUseInput {
            session_id: "s".to_string(),
            tool_name: "Bash".to_string(),
            tool_call_id: "1".to_string(),
            tool_input: json!({"command": "cd /tmp"}),
        };
        let output = run(&input, &ctx, 1, true);
        assert!(!output.continue_);
    }

    #[test]
    fn manual_mode_warns_but_allows_a_bare_cd() {
        let dir = tempdir().unwrap();
        let ctx = ctx(&dir);
        let input = PreToolUseInput {
            session_id: "s".to_string(),
            tool_name: "Bash".to_string(),
            tool_call_id: "1".to_string(),
            tool_input: json!({"command": "cd /tmp"}),
        };
        let output = run(&input, &ctx, 1, false);
        assert!(output.continue_);
        assert!(output.system_message.is_some());
    }

    #[test]
    fn chained_cd_is_not_blocked() {
        let dir = tempdir().unwrap();
        let ctx = ctx(&dir);
        let input = PreToolUseInput {
            session_id: "s".to_string(),
            tool_name: "Bash".to_string(),
            tool_call_id: "1".to_string(),
            tool_input: json!({"command": "cd /tmp && ls"}),
        };
        let output = run(&input, &ctx, 1, true);
        assert!(output.continue_);
    }

    #[test]
    fn delegation_tool_also_emits_delegation_started() {
        let dir = tempdir().unwrap();
        let ctx = ctx(&dir);
        let input = PreToolUseInput {
            session_id: "s".to_string(),
            tool_name: "Task".to_string(),
            tool_call_id: "1".to_string(),
            tool_input: json!({"subagent_type": "general-purpose", "description": "investigate"}),
        };
        run(&input, &ctx, 1, true);
        let records = ctx.log.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].event_name(), "delegation_started");
    }
}
