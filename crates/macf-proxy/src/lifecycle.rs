//! Proxy lifecycle (spec §4.10): bind, serve until SIGTERM, release the PID
//! file. Mirrors the warm search daemon's lifecycle shape (spec §4.9).

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;

use macf_search_daemon::PidFile;

use crate::config::ProxyConfig;
use crate::server::{build_router, AppState};

/// Run the proxy to completion. Exits the process with status 1 on a
/// port-bind failure, matching the search daemon's behavior.
pub async fn run(config: ProxyConfig, expected_policies: BTreeSet<String>) -> Result<()> {
    let addr = config.listen_addr;
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "proxy failed to bind");
            std::process::exit(1);
        }
    };

    let pid_file = PidFile::write(&config.pid_path).context("writing proxy pid file")?;
    tracing::info!(%addr, "proxy listening");

    let state = Arc::new(AppState::new(config, expected_policies));
    let router = build_router(state);
    let mut sigterm = signal_terminate()?;

    tokio::select! {
        result = axum::serve(listener, router.into_make_service()) => {
            result.context("proxy server exited")?;
        }
        _ = sigterm.recv() => {
            tracing::info!("proxy received SIGTERM, shutting down");
        }
    }

    drop(pid_file);
    Ok(())
}

#[cfg(unix)]
fn signal_terminate() -> Result<tokio::signal::unix::Signal> {
    Ok(tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?)
}
