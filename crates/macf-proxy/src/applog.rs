//! `agent_api_log.jsonl` (spec §6): `{type: "api_request"|"api_response",
//! ts, ...}` records, one line per forwarded request/response. Append
//! style mirrors the event log's lock-then-write-then-unlock discipline.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde_json::Value;

pub struct ApiLog {
    path: PathBuf,
}

impl ApiLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record_request(&self, fields: Value) -> bool {
        self.append("api_request", fields)
    }

    pub fn record_response(&self, fields: Value) -> bool {
        self.append("api_response", fields)
    }

    fn append(&self, record_type: &str, mut fields: Value) -> bool {
        self.try_append(record_type, &mut fields).is_ok()
    }

    fn try_append(&self, record_type: &str, fields: &mut Value) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        if let Some(obj) = fields.as_object_mut() {
            obj.insert("type".to_string(), Value::String(record_type.to_string()));
            obj.insert("ts".to_string(), serde_json::json!(ts));
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.lock_exclusive()?;
        let result = (|| -> std::io::Result<()> {
            writeln!(file, "{fields}")?;
            file.flush()
        })();
        FileExt::unlock(&file)?;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn appended_records_carry_type_and_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let log = ApiLog::new(dir.path().join("agent_api_log.jsonl"));
        log.record_request(json!({"model": "claude-x"}));
        log.record_response(json!({"latency_ms": 123}));

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<Value> = contents.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines[0]["type"], "api_request");
        assert_eq!(lines[0]["model"], "claude-x");
        assert_eq!(lines[1]["type"], "api_response");
        assert_eq!(lines[1]["latency_ms"], 123);
    }
}
