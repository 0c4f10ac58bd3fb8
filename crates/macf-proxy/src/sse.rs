//! Hand-rolled SSE event parsing for the streaming response path (spec
//! §4.10 response path). The proxy must pass chunks through to the client
//! verbatim and untouched in timing; this tracker only ever buffers up to
//! the next blank-line event boundary, never the full body.

use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct SseTracker {
    buffer: String,
    pub message_id: Option<String>,
    pub model: Option<String>,
    pub stop_reason: Option<String>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

impl SseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one passthrough chunk. The chunk itself is never consumed or
    /// altered by this call — callers forward it to the client unchanged
    /// and call this purely to update the tracked metadata.
    pub fn feed(&mut self, chunk: &str) {
        self.buffer.push_str(chunk);
        while let Some(pos) = self.buffer.find("\n\n") {
            let event_text: String = self.buffer.drain(..pos + 2).collect();
            self.parse_event(&event_text);
        }
    }

    fn parse_event(&mut self, event_text: &str) {
        let mut event_name = None;
        let mut data_lines = Vec::new();
        for line in event_text.lines() {
            if let Some(rest) = line.strip_prefix("event:") {
                event_name = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("data:") {
                data_lines.push(rest.trim());
            }
        }
        let Some(event_name) = event_name else { return };
        if event_name != "message_start" && event_name != "message_delta" {
            return;
        }
        let Ok(data) = serde_json::from_str::<Value>(&data_lines.join("\n")) else { return };
        match event_name.as_str() {
            "message_start" => {
                if let Some(message) = data.get("message") {
                    self.message_id = message.get("id").and_then(Value::as_str).map(str::to_string);
                    self.model = message.get("model").and_then(Value::as_str).map(str::to_string);
                    if let Some(tokens) = message.get("usage").and_then(|u| u.get("input_tokens")).and_then(Value::as_u64) {
                        self.input_tokens = Some(tokens);
                    }
                }
            }
            "message_delta" => {
                if let Some(reason) = data.get("delta").and_then(|d| d.get("stop_reason")).and_then(Value::as_str) {
                    self.stop_reason = Some(reason.to_string());
                }
                if let Some(tokens) = data.get("usage").and_then(|u| u.get("output_tokens")).and_then(Value::as_u64) {
                    self.output_tokens = Some(tokens);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_start_captures_id_model_and_input_tokens() {
        let mut tracker = SseTracker::new();
        tracker.feed(
            "event: message_start\ndata: {\"message\":{\"id\":\"msg_1\",\"model\":\"claude-x\",\"usage\":{\"input_tokens\":42}}}\n\n",
        );
        assert_eq!(tracker.message_id.as_deref(), Some("msg_1"));
        assert_eq!(tracker.model.as_deref(), Some("claude-x"));
        assert_eq!(tracker.input_tokens, Some(42));
    }

    #[test]
    fn message_delta_captures_stop_reason_and_output_tokens() {
        let mut tracker = SseTracker::new();
        tracker.feed("event: message_delta\ndata: {\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"output_tokens\":7}}\n\n");
        assert_eq!(tracker.stop_reason.as_deref(), Some("end_turn"));
        assert_eq!(tracker.output_tokens, Some(7));
    }

    #[test]
    fn an_event_split_across_two_chunks_still_parses() {
        let mut tracker = SseTracker::new();
        tracker.feed("event: message_delta\ndata: {\"delta\":{\"stop_reason\":\"end_turn\"}");
        assert!(tracker.stop_reason.is_none());
        tracker.feed(",\"usage\":{\"output_tokens\":3}}\n\n");
        assert_eq!(tracker.stop_reason.as_deref(), Some("end_turn"));
        assert_eq!(tracker.output_tokens, Some(3));
    }

    #[test]
    fn unrelated_events_are_ignored() {
        let mut tracker = SseTracker::new();
        tracker.feed("event: content_block_delta\ndata: {\"index\":0}\n\n");
        assert!(tracker.model.is_none());
        assert!(tracker.stop_reason.is_none());
    }
}
