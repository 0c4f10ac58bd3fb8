//! Reverse proxy server (spec §4.10): one `POST /v1/messages` route that
//! logs metadata, tracks injection state, rewrites stale injection blocks,
//! and forwards to the real upstream — streaming the response through
//! untouched.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use futures::StreamExt;
use serde_json::{json, Value};

use macf_eventlog::EventLog;

use crate::applog::ApiLog;
use crate::capture::CaptureDir;
use crate::config::ProxyConfig;
use crate::injection::{scan_injected_policies, InjectionTracker};
use crate::metadata::{extract_request_metadata, extract_response_metadata};
use crate::mode_tracker::ModeTracker;
use crate::rewriter::{rewrite, RewriteMode};
use crate::sse::SseTracker;

/// Request headers never forwarded upstream verbatim (spec §4.10 step 4).
const HOP_BY_HOP: &[&str] = &["host", "content-length", "transfer-encoding", "content-encoding"];

pub struct AppState {
    pub config: ProxyConfig,
    pub client: reqwest::Client,
    pub api_log: ApiLog,
    pub events_log: EventLog,
    pub tracker: InjectionTracker,
    pub mode_tracker: ModeTracker,
    pub capture: Option<CaptureDir>,
    sequence: AtomicU64,
}

impl AppState {
    pub fn new(config: ProxyConfig, expected_policies: std::collections::BTreeSet<String>) -> Self {
        let events_log = EventLog::new(config.events_log_path.clone());
        let api_log = ApiLog::new(config.api_log_path.clone());
        let capture = config.capture_dir.clone().map(CaptureDir::new);
        Self {
            config,
            client: reqwest::Client::new(),
            api_log,
            events_log,
            tracker: InjectionTracker::new(expected_policies),
            mode_tracker: ModeTracker::new(),
            capture,
            sequence: AtomicU64::new(0),
        }
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new().route("/v1/messages", post(handle_messages)).with_state(state)
}

fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in headers {
        if HOP_BY_HOP.iter().any(|h| name.as_str().eq_ignore_ascii_case(h)) {
            continue;
        }
        out.insert(name.clone(), value.clone());
    }
    out
}

async fn handle_messages(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Response {
    let Ok(mut request_body) = serde_json::from_slice::<Value>(&body) else {
        return (StatusCode::BAD_REQUEST, "invalid JSON body").into_response();
    };

    let sequence = state.next_sequence();
    let request_meta = extract_request_metadata(&request_body);
    let breadcrumb_token = format!("proxy-seq:{sequence}");

    let injection_report = request_meta
        .is_main_conversation
        .then(|| state.tracker.observe(scan_injected_policies(&request_body["messages"])));

    let mode = state.mode_tracker.next_mode(&state.events_log);
    let rewrite_report = rewrite(&mut request_body, mode, &breadcrumb_token);

    state.api_log.record_request(json!({
        "sequence": sequence,
        "model": request_meta.model,
        "message_count": request_meta.message_count,
        "system_prompt_chars": request_meta.system_prompt_chars,
        "tool_count": request_meta.tool_count,
        "streaming": request_meta.streaming,
        "is_main_conversation": request_meta.is_main_conversation,
        "injection_report": injection_report,
        "rewrite_mode": format!("{mode:?}"),
        "rewrite_report": rewrite_report,
    }));
    if let Some(capture) = &state.capture {
        let _ = capture.write_request(sequence, &request_body);
    }

    let upstream_url = format!("{}/v1/messages", state.config.upstream_base_url.trim_end_matches('/'));
    let mut upstream_request = state.client.post(&upstream_url).headers(forwardable_headers(&headers));
    let Ok(rewritten_bytes) = serde_json::to_vec(&request_body) else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "failed to re-encode request").into_response();
    };
    upstream_request = upstream_request.body(rewritten_bytes);

    let start = Instant::now();
    let upstream_response = match upstream_request.send().await {
        Ok(response) => response,
        Err(error) => {
            state.api_log.record_response(json!({"sequence": sequence, "error": error.to_string()}));
            return (StatusCode::BAD_GATEWAY, format!("upstream request failed: {error}")).into_response();
        }
    };

    let status = upstream_response.status();
    let response_headers = upstream_response.headers().clone();

    if request_meta.streaming {
        stream_response(state, sequence, status, response_headers, upstream_response, start)
    } else {
        buffered_response(state, sequence, status, response_headers, upstream_response, start).await
    }
}

async fn buffered_response(
    state: Arc<AppState>,
    sequence: u64,
    status: reqwest::StatusCode,
    headers: reqwest::header::HeaderMap,
    upstream_response: reqwest::Response,
    start: Instant,
) -> Response {
    let body_bytes = upstream_response.bytes().await.unwrap_or_default();
    let latency_ms = start.elapsed().as_millis() as u64;

    if let Ok(body_json) = serde_json::from_slice::<Value>(&body_bytes) {
        let response_meta = extract_response_metadata(&body_json);
        let mut record = json!({
            "sequence": sequence,
            "latency_ms": latency_ms,
            "model": response_meta.model,
            "stop_reason": response_meta.stop_reason,
            "input_tokens": response_meta.input_tokens,
            "output_tokens": response_meta.output_tokens,
        });
        record["status"] = json!(status.as_u16());
        state.api_log.record_response(record);
        if let Some(capture) = &state.capture {
            let _ = capture.write_response(sequence, &body_json, None);
        }
    }

    let mut builder = Response::builder().status(axum_status(status));
    for (name, value) in &headers {
        if HOP_BY_HOP.iter().any(|h| name.as_str().eq_ignore_ascii_case(h)) {
            continue;
        }
        if let Ok(name) = HeaderName::from_bytes(name.as_str().as_bytes()) {
            builder = builder.header(name, value.as_bytes());
        }
    }
    builder.body(Body::from(body_bytes)).unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn stream_response(
    state: Arc<AppState>,
    sequence: u64,
    status: reqwest::StatusCode,
    headers: reqwest::header::HeaderMap,
    upstream_response: reqwest::Response,
    start: Instant,
) -> Response {
    let byte_stream = upstream_response.bytes_stream();
    let tracker = Arc::new(std::sync::Mutex::new(SseTracker::new()));
    let captured_text = Arc::new(std::sync::Mutex::new(String::new()));
    let has_capture = state.capture.is_some();

    let tracker_for_stream = tracker.clone();
    let captured_for_stream = captured_text.clone();
    let mapped = byte_stream.inspect(move |chunk| {
        if let Ok(bytes) = chunk {
            if let Ok(text) = std::str::from_utf8(bytes) {
                tracker_for_stream.lock().unwrap().feed(text);
                if has_capture {
                    captured_for_stream.lock().unwrap().push_str(text);
                }
            }
        }
    });

    let state_for_tail = state.clone();
    let tracker_for_tail = tracker.clone();
    let captured_for_tail = captured_text.clone();
    let finished = mapped.chain(futures::stream::once(async move {
        let latency_ms = start.elapsed().as_millis() as u64;
        let snapshot = tracker_for_tail.lock().unwrap().clone();
        state_for_tail.api_log.record_response(json!({
            "sequence": sequence,
            "latency_ms": latency_ms,
            "status": status.as_u16(),
            "model": snapshot.model,
            "stop_reason": snapshot.stop_reason,
            "input_tokens": snapshot.input_tokens,
            "output_tokens": snapshot.output_tokens,
        }));
        if let Some(capture) = &state_for_tail.capture {
            let text = captured_for_tail.lock().unwrap().clone();
            let _ = capture.write_response(sequence, &json!({"model": snapshot.model}), Some(&text));
        }
        Ok::<Bytes, reqwest::Error>(Bytes::new())
    }));
    // The tail future's only purpose is its side effect (final logging);
    // drop its empty placeholder chunk so the forwarded body stays
    // byte-for-byte identical to what upstream sent.
    let finished = finished.filter(|item| futures::future::ready(!matches!(item, Ok(b) if b.is_empty())));

    let mut builder = Response::builder().status(axum_status(status));
    for (name, value) in &headers {
        if HOP_BY_HOP.iter().any(|h| name.as_str().eq_ignore_ascii_case(h)) {
            continue;
        }
        if let Ok(name) = HeaderName::from_bytes(name.as_str().as_bytes()) {
            builder = builder.header(name, value.as_bytes());
        }
    }
    builder
        .body(Body::from_stream(finished))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn axum_status(status: reqwest::StatusCode) -> StatusCode {
    StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hop_by_hop_headers_are_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert("host", "example.com".parse().unwrap());
        headers.insert("content-length", "10".parse().unwrap());
        headers.insert("authorization", "Bearer x".parse().unwrap());
        let forwarded = forwardable_headers(&headers);
        assert!(forwarded.get("host").is_none());
        assert!(forwarded.get("content-length").is_none());
        assert!(forwarded.get("authorization").is_some());
    }
}
