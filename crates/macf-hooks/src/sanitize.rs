//! Output sanitization for `post_tool_use` (spec §4.6: "sanitized output,
//! large stdout replaced by size placeholder").

/// Above this many characters a tool's stringified output is replaced with
/// a size placeholder before it's written to the event log.
pub const MAX_OUTPUT_CHARS: usize = 4000;

pub fn summarize_output(output: &serde_json::Value) -> String {
    let text = match output {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.len() > MAX_OUTPUT_CHARS {
        format!("[output truncated: {} bytes]", text.len())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_output_passes_through() {
        let value = serde_json::Value::String("ok".to_string());
        assert_eq!(summarize_output(&value), "ok");
    }

    #[test]
    fn long_output_is_replaced_with_a_size_placeholder() {
        let value = serde_json::Value::String("x".repeat(MAX_OUTPUT_CHARS + 1));
        let summary = summarize_output(&value);
        assert!(summary.starts_with("[output truncated:"));
    }
}
