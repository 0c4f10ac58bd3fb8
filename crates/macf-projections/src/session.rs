//! Session identity and prompt-uuid acquisition (spec §4.4).
//!
//! The host agent's own transcript is read-only and of unspecified shape
//! beyond "JSONL, one message per line"; every reader here tolerates
//! arbitrary message shapes and simply skips what it can't interpret.

use std::path::Path;

use macf_eventlog::EventLog;
use macf_types::EventKind;

/// Primary: most recent `session_started` in the event log. Fallback
/// (first run only): mtime-newest JSONL file under the host transcripts
/// directory.
pub fn current_session_id(log: &EventLog, transcripts_dir: &Path) -> crate::error::Result<Option<String>> {
    for record in log.read(None, true)? {
        if let EventKind::SessionStarted(d) = &record.kind {
            return Ok(Some(d.session_id.clone()));
        }
    }
    Ok(newest_transcript_session_id(transcripts_dir))
}

fn newest_transcript_session_id(transcripts_dir: &Path) -> Option<String> {
    let entries = std::fs::read_dir(transcripts_dir).ok()?;
    let newest = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("jsonl"))
        .filter_map(|e| {
            let modified = e.metadata().ok()?.modified().ok()?;
            Some((modified, e.path()))
        })
        .max_by_key(|(modified, _)| *modified)?;
    newest.1.file_stem().map(|s| s.to_string_lossy().into_owned())
}

/// Scan a transcript JSONL file's tail in reverse for the most recent
/// user-role message whose content is a plain text prompt (not a tool
/// result or hook envelope), and return its uuid.
pub fn last_user_prompt_uuid(transcript_path: &Path) -> crate::error::Result<Option<String>> {
    let Ok(contents) = std::fs::read_to_string(transcript_path) else {
        return Ok(None);
    };
    for line in contents.lines().rev() {
        if line.trim().is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<serde_json::Value>(line) else {
            continue;
        };
        if let Some(uuid) = extract_plain_user_prompt_uuid(&value) {
            return Ok(Some(uuid));
        }
    }
    Ok(None)
}

fn extract_plain_user_prompt_uuid(value: &serde_json::Value) -> Option<String> {
    let is_user = value.get("type").and_then(|t| t.as_str()) == Some("user")
        || value
            .get("message")
            .and_then(|m| m.get("role"))
            .and_then(|r| r.as_str())
            == Some("user");
    if !is_user {
        return None;
    }
    // Hook and tool-result envelopes carry a `toolUseResult` sibling, or a
    // content array whose blocks are `tool_result` rather than plain text.
    if value.get("toolUseResult").is_some() {
        return None;
    }
    let content = value.get("message").and_then(|m| m.get("content")).or_else(|| value.get("content"))?;
    let is_plain_text = match content {
        serde_json::Value::String(_) => true,
        serde_json::Value::Array(blocks) => blocks
            .iter()
            .all(|b| b.get("type").and_then(|t| t.as_str()) == Some("text")),
        _ => false,
    };
    if !is_plain_text {
        return None;
    }
    value
        .get("uuid")
        .and_then(|u| u.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn finds_plain_user_prompt_and_skips_tool_results() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.jsonl");
        std::fs::write(
            &path,
            concat!(
                "{\"type\":\"user\",\"uuid\":\"first\",\"message\":{\"role\":\"user\",\"content\":\"hi\"}}\n",
                "{\"type\":\"user\",\"uuid\":\"tool\",\"toolUseResult\":{},\"message\":{\"role\":\"user\",\"content\":[]}}\n",
                "{\"type\":\"assistant\",\"uuid\":\"asst\",\"message\":{\"role\":\"assistant\",\"content\":\"hello\"}}\n",
                "{\"type\":\"user\",\"uuid\":\"last\",\"message\":{\"role\":\"user\",\"content\":[{\"type\":\"text\",\"text\":\"do thing\"}]}}\n",
            ),
        )
        .unwrap();
        let uuid = last_user_prompt_uuid(&path).unwrap();
        assert_eq!(uuid.as_deref(), Some("last"));
    }

    #[test]
    fn missing_transcript_returns_none() {
        let dir = tempdir().unwrap();
        let uuid = last_user_prompt_uuid(&dir.path().join("nope.jsonl")).unwrap();
        assert!(uuid.is_none());
    }
}
