//! Per-connection handling: read one line-delimited JSON request, dispatch
//! through the registry, write one line-delimited JSON response.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::protocol::{Request, Response};
use crate::retriever::Registry;

/// Matches the 4 KB read granularity from spec §4.9: `BufReader`'s default
/// capacity is 8 KB, so this is made explicit with `with_capacity`.
const READ_CHUNK: usize = 4096;

pub async fn handle_connection(stream: TcpStream, registry: Arc<Registry>) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::with_capacity(READ_CHUNK, read_half);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => return, // peer closed
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "search daemon connection read failed");
                return;
            }
        }

        let response = match serde_json::from_str::<Request>(line.trim_end()) {
            Ok(request) => registry.search(&request.namespace, &request.query, request.limit),
            Err(e) => Response::error(format!("malformed request: {e}")),
        };

        let mut payload = serde_json::to_vec(&response).unwrap_or_default();
        payload.push(b'\n');
        if write_half.write_all(&payload).await.is_err() {
            return;
        }
    }
}
