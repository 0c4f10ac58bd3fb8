//! Runner dispatch by name (spec §4.6), used by the CLI's `hooks run <name>`
//! debug command and by each runner's own thin binary entry point.

use anyhow::{Context, Result};
use serde_json::Value;

use macf_types::hook::{
    NotificationInput, PermissionRequestInput, PreCompactInput, PreToolUseInput, PostToolUseInput, SessionEndInput,
    SessionStartInput, StopInput, SubagentStopInput, UserPromptSubmitInput,
};
use macf_types::{HookOutput, Manifest};

use crate::context::HookContext;
use crate::{bookkeeping, post_tool_use, pre_tool_use, session_start, stop, subagent_stop, user_prompt_submit};

pub const RUNNER_NAMES: &[&str] = &[
    "session_start",
    "user_prompt_submit",
    "pre_tool_use",
    "post_tool_use",
    "stop",
    "subagent_stop",
    "session_end",
    "pre_compact",
    "permission_request",
    "notification",
];

pub struct DispatchEnv<'a> {
    pub ctx: &'a HookContext,
    pub manifest: &'a Manifest,
    pub search_daemon_addr: &'a str,
    pub auto_mode: bool,
}

/// Deserialize `input_json` into the runner's expected shape and run it.
/// Returns an error only for an unrecognized runner name or malformed
/// input JSON — the runners themselves never fail once dispatched.
pub fn dispatch(name: &str, input_json: Value, env: &DispatchEnv<'_>) -> Result<HookOutput> {
    let cycle = macf_projections::cycle_number(&env.ctx.log).unwrap_or(0);
    match name {
        "session_start" => {
            let input: SessionStartInput = serde_json::from_value(input_json).context("session_start input")?;
            Ok(session_start::run(&input, env.ctx, env.manifest))
        }
        "user_prompt_submit" => {
            let input: UserPromptSubmitInput = serde_json::from_value(input_json).context("user_prompt_submit input")?;
            Ok(user_prompt_submit::run(&input, env.ctx, env.search_daemon_addr))
        }
        "pre_tool_use" => {
            let input: PreToolUseInput = serde_json::from_value(input_json).context("pre_tool_use input")?;
            Ok(pre_tool_use::run(&input, env.ctx, cycle, env.auto_mode))
        }
        "post_tool_use" => {
            let input: PostToolUseInput = serde_json::from_value(input_json).context("post_tool_use input")?;
            Ok(post_tool_use::run(&input, env.ctx, cycle))
        }
        "stop" => {
            let input: StopInput = serde_json::from_value(input_json).context("stop input")?;
            Ok(stop::run(&input, env.ctx, cycle))
        }
        "subagent_stop" => {
            let input: SubagentStopInput = serde_json::from_value(input_json).context("subagent_stop input")?;
            Ok(subagent_stop::run(&input, env.ctx, cycle))
        }
        "session_end" => {
            let input: SessionEndInput = serde_json::from_value(input_json).context("session_end input")?;
            Ok(bookkeeping::session_end(&input, env.ctx, cycle))
        }
        "pre_compact" => {
            let input: PreCompactInput = serde_json::from_value(input_json).context("pre_compact input")?;
            Ok(bookkeeping::pre_compact(&input, env.ctx, cycle))
        }
        "permission_request" => {
            let input: PermissionRequestInput = serde_json::from_value(input_json).context("permission_request input")?;
            Ok(bookkeeping::permission_request(&input, env.ctx, cycle))
        }
        "notification" => {
            let input: NotificationInput = serde_json::from_value(input_json).context("notification input")?;
            Ok(bookkeeping::notification(&input, env.ctx, cycle))
        }
        other => anyhow::bail!("unknown hook runner: {other}"),
    }
}
