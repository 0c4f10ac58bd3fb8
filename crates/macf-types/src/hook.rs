//! Hook I/O schema (spec §4.6, §9 redesign flag: hook inputs/outputs as
//! typed structs rather than loose dicts).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The `source` discriminant on `session_start` input, and the shape the
/// other nine runners' inputs collapse to once `source` isn't meaningful
/// for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStartSource {
    Startup,
    Resume,
    Compact,
    Clear,
}

/// Input to `session_start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStartInput {
    pub session_id: String,
    pub source: SessionStartSource,
    #[serde(default)]
    pub transcript_path: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPromptSubmitInput {
    pub session_id: String,
    pub prompt: String,
    #[serde(default)]
    pub prompt_uuid: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreToolUseInput {
    pub session_id: String,
    pub tool_name: String,
    pub tool_call_id: String,
    #[serde(default)]
    pub tool_input: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostToolUseInput {
    pub session_id: String,
    pub tool_name: String,
    pub tool_call_id: String,
    #[serde(default)]
    pub tool_input: Value,
    #[serde(default)]
    pub tool_response: Value,
    #[serde(default)]
    pub is_error: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopInput {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubagentStopInput {
    pub session_id: String,
    #[serde(default)]
    pub subagent_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEndInput {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreCompactInput {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRequestInput {
    pub session_id: String,
    pub tool_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationInput {
    pub session_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// The union of all ten runners' inputs, discriminated at the Rust level by
/// which runner is being invoked rather than by a wire tag — each runner's
/// binary entry point knows which variant it expects and deserializes
/// directly into it; this enum exists so library code that dispatches
/// across runners (tests, the CLI's `hook run` debug command) can hold any
/// of them uniformly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HookInput {
    SessionStart(SessionStartInput),
    UserPromptSubmit(UserPromptSubmitInput),
    PreToolUse(PreToolUseInput),
    PostToolUse(PostToolUseInput),
    Stop(StopInput),
    SubagentStop(SubagentStopInput),
    SessionEnd(SessionEndInput),
    PreCompact(PreCompactInput),
    PermissionRequest(PermissionRequestInput),
    Notification(NotificationInput),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookSpecificOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}

/// Output returned by every runner. `continue_` always serializes as
/// `continue` on the wire (a reserved word in Rust).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookOutput {
    #[serde(rename = "continue")]
    pub continue_: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_specific_output: Option<HookSpecificOutput>,
}

impl HookOutput {
    pub fn allow() -> Self {
        HookOutput {
            continue_: true,
            system_message: None,
            hook_specific_output: None,
        }
    }

    pub fn block(message: impl Into<String>) -> Self {
        HookOutput {
            continue_: false,
            system_message: Some(message.into()),
            hook_specific_output: None,
        }
    }

    pub fn with_system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = Some(message.into());
        self
    }

    /// Wrap `context` in the `<system-reminder>` tag the host agent expects
    /// around injected context (§4.6).
    pub fn with_additional_context(mut self, context: impl Into<String>) -> Self {
        self.hook_specific_output = Some(HookSpecificOutput {
            additional_context: Some(format!("<system-reminder>\n{}\n</system-reminder>", context.into())),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_serializes_continue_as_reserved_word() {
        let output = HookOutput::allow();
        let json = serde_json::to_string(&output).unwrap();
        assert!(json.contains("\"continue\":true"));
    }

    #[test]
    fn additional_context_is_wrapped_in_system_reminder_tag() {
        let output = HookOutput::allow().with_additional_context("hello");
        let ctx = output
            .hook_specific_output
            .unwrap()
            .additional_context
            .unwrap();
        assert!(ctx.starts_with("<system-reminder>"));
        assert!(ctx.ends_with("</system-reminder>"));
        assert!(ctx.contains("hello"));
    }

    #[test]
    fn block_sets_continue_false() {
        let output = HookOutput::block("nope");
        assert!(!output.continue_);
        assert_eq!(output.system_message.as_deref(), Some("nope"));
    }
}
