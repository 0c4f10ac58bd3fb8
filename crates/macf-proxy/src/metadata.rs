//! Request/response metadata extraction for `agent_api_log.jsonl` (spec
//! §4.10 step 1), over the Anthropic Messages API request/response shape.

use serde_json::Value;

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct RequestMetadata {
    pub model: Option<String>,
    pub message_count: usize,
    pub system_prompt_chars: usize,
    pub tool_count: usize,
    pub streaming: bool,
    pub is_main_conversation: bool,
}

/// A request "looks like" the main conversation when it carries a
/// top-level `context_management` key; sub-hook calls never set it.
pub fn is_main_conversation(body: &Value) -> bool {
    body.get("context_management").is_some()
}

pub fn extract_request_metadata(body: &Value) -> RequestMetadata {
    let model = body.get("model").and_then(Value::as_str).map(str::to_string);
    let message_count = body.get("messages").and_then(Value::as_array).map(Vec::len).unwrap_or(0);
    let system_prompt_chars = match body.get("system") {
        Some(Value::String(s)) => s.chars().count(),
        Some(Value::Array(blocks)) => blocks
            .iter()
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .map(|s| s.chars().count())
            .sum(),
        _ => 0,
    };
    let tool_count = body.get("tools").and_then(Value::as_array).map(Vec::len).unwrap_or(0);
    let streaming = body.get("stream").and_then(Value::as_bool).unwrap_or(false);

    RequestMetadata {
        model,
        message_count,
        system_prompt_chars,
        tool_count,
        streaming,
        is_main_conversation: is_main_conversation(body),
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ResponseMetadata {
    pub model: Option<String>,
    pub stop_reason: Option<String>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// Metadata from a non-streaming response body, minus its `content` array.
pub fn extract_response_metadata(body: &Value) -> ResponseMetadata {
    let usage = body.get("usage");
    ResponseMetadata {
        model: body.get("model").and_then(Value::as_str).map(str::to_string),
        stop_reason: body.get("stop_reason").and_then(Value::as_str).map(str::to_string),
        input_tokens: usage.and_then(|u| u.get("input_tokens")).and_then(Value::as_u64),
        output_tokens: usage.and_then(|u| u.get("output_tokens")).and_then(Value::as_u64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_counts_from_a_typical_request() {
        let body = json!({
            "model": "claude-x",
            "stream": true,
            "context_management": {},
            "system": "you are an agent",
            "messages": [{"role": "user", "content": "hi"}, {"role": "assistant", "content": "hello"}],
            "tools": [{"name": "Bash"}, {"name": "Read"}],
        });
        let meta = extract_request_metadata(&body);
        assert_eq!(meta.model.as_deref(), Some("claude-x"));
        assert_eq!(meta.message_count, 2);
        assert_eq!(meta.system_prompt_chars, "you are an agent".len());
        assert_eq!(meta.tool_count, 2);
        assert!(meta.streaming);
        assert!(meta.is_main_conversation);
    }

    #[test]
    fn sub_hook_calls_lack_context_management() {
        let body = json!({"model": "claude-x", "messages": []});
        assert!(!is_main_conversation(&body));
    }
}
