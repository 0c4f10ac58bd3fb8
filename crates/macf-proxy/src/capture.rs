//! Capture mode (spec §4.10): when `MACF_PROXY_CAPTURE_DIR` is configured,
//! write full request/response JSON to timestamped files without touching
//! the streaming passthrough path itself.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::Value;

pub struct CaptureDir {
    dir: PathBuf,
}

impl CaptureDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_env() -> Option<Self> {
        std::env::var("MACF_PROXY_CAPTURE_DIR").ok().map(PathBuf::from).map(Self::new)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_request(&self, sequence: u64, body: &Value) -> std::io::Result<PathBuf> {
        self.write("request", sequence, body)
    }

    /// `content_text` is the SSE-reassembled text for a streaming response
    /// (`None` when the response was non-streaming and already complete).
    pub fn write_response(&self, sequence: u64, body: &Value, content_text: Option<&str>) -> std::io::Result<PathBuf> {
        let mut body = body.clone();
        if let Some(text) = content_text {
            if let Some(obj) = body.as_object_mut() {
                obj.insert("content_text".to_string(), Value::String(text.to_string()));
            }
        }
        self.write("response", sequence, &body)
    }

    fn write(&self, kind: &str, sequence: u64, body: &Value) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3f");
        let path = self.dir.join(format!("{stamp}_{sequence:06}_{kind}.json"));
        std::fs::write(&path, serde_json::to_vec_pretty(body).unwrap_or_default())?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn writes_request_and_response_files_into_the_capture_dir() {
        let dir = tempfile::tempdir().unwrap();
        let capture = CaptureDir::new(dir.path());
        let req_path = capture.write_request(1, &json!({"model": "claude-x"})).unwrap();
        let resp_path = capture.write_response(1, &json!({"model": "claude-x"}), Some("hello")).unwrap();

        assert!(req_path.exists());
        let resp_body: Value = serde_json::from_str(&std::fs::read_to_string(&resp_path).unwrap()).unwrap();
        assert_eq!(resp_body["content_text"], "hello");
    }
}
