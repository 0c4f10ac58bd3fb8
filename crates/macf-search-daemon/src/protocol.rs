//! Wire protocol (spec §4.9): line-delimited JSON over TCP.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    pub namespace: String,
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    5
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Response {
    pub formatted: String,
    #[serde(default)]
    pub explanations: Vec<String>,
    #[serde(default)]
    pub search_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn empty() -> Self {
        Response::default()
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response {
            error: Some(message.into()),
            ..Default::default()
        }
    }
}
