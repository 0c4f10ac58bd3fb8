//! Stdlib-only blocking client (spec §4.9), used from hook runners where
//! pulling in tokio would be wasteful: a single blocking round trip with a
//! tight timeout that degrades to an empty response rather than raising.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::protocol::{Request, Response};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);
pub const MIN_PROMPT_LEN: usize = 10;

/// Query the daemon at `addr`. Any failure — connection refused, timeout,
/// malformed response — degrades to an empty [`Response`] rather than
/// propagating an error, since a hook must never fail the turn because the
/// search daemon happens to be down.
pub fn query(addr: &str, namespace: &str, query: &str, limit: usize, timeout: Duration) -> Response {
    try_query(addr, namespace, query, limit, timeout).unwrap_or_else(|_| Response::empty())
}

fn try_query(addr: &str, namespace: &str, query: &str, limit: usize, timeout: Duration) -> std::io::Result<Response> {
    let stream = TcpStream::connect_timeout(&addr.parse().map_err(std::io::Error::other)?, timeout)?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;

    let request = Request {
        namespace: namespace.to_string(),
        query: query.to_string(),
        limit,
    };
    let mut line = serde_json::to_vec(&request).map_err(std::io::Error::other)?;
    line.push(b'\n');

    let mut writer = &stream;
    writer.write_all(&line)?;

    let mut reader = BufReader::new(&stream);
    let mut response_line = String::new();
    reader.read_line(&mut response_line)?;
    serde_json::from_str(response_line.trim_end()).map_err(std::io::Error::other)
}

/// Convenience wrapper for the `policy` namespace used by hook runners.
/// Prompts under [`MIN_PROMPT_LEN`] characters are assumed too short to
/// carry a meaningful policy query and short-circuit to an empty string.
pub fn get_policy_injection(addr: &str, prompt: &str) -> String {
    if prompt.trim().len() < MIN_PROMPT_LEN {
        return String::new();
    }
    query(addr, "policy", prompt, 5, DEFAULT_TIMEOUT).formatted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_prompts_never_touch_the_network() {
        // An unreachable address would hang/timeout if dialed; a too-short
        // prompt must short-circuit before that happens.
        assert_eq!(get_policy_injection("127.0.0.1:1", "short"), "");
    }

    #[test]
    fn connection_refused_degrades_to_empty_response() {
        let response = query("127.0.0.1:1", "policy", "a sufficiently long query", 5, Duration::from_millis(50));
        assert_eq!(response.formatted, "");
    }
}
