//! Proxy configuration (spec §4.10, §6 `MACF_PROXY_CAPTURE_DIR`).

use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8019;

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub listen_addr: SocketAddr,
    pub upstream_base_url: String,
    pub events_log_path: PathBuf,
    pub api_log_path: PathBuf,
    pub capture_dir: Option<PathBuf>,
    pub pid_path: PathBuf,
}

impl ProxyConfig {
    pub fn new(project_root: &std::path::Path, upstream_base_url: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], port.unwrap_or(DEFAULT_PORT))),
            upstream_base_url: upstream_base_url.into(),
            events_log_path: macf_core::path::resolve_events_log_path(project_root, None),
            api_log_path: macf_core::path::resolve_proxy_log_path(project_root),
            capture_dir: std::env::var("MACF_PROXY_CAPTURE_DIR").ok().map(PathBuf::from),
            pid_path: project_root.join(".macf").join("proxy.pid"),
        }
    }
}
