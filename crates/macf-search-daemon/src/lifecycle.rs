//! Daemon lifecycle (spec §4.9): bind, warm up every registered retriever,
//! accept connections until SIGTERM, then release the PID file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;

use crate::pidfile::PidFile;
use crate::retriever::Registry;
use crate::server::handle_connection;

pub const DEFAULT_PORT: u16 = 9001;

pub struct DaemonConfig {
    pub port: u16,
    pub pid_path: PathBuf,
}

impl DaemonConfig {
    pub fn new(pid_path: PathBuf) -> Self {
        Self { port: DEFAULT_PORT, pid_path }
    }
}

/// Run the daemon to completion. Exits the process with status 1 on a
/// port-bind failure, per spec §4.9.
pub async fn run(config: DaemonConfig, mut registry: Registry) -> Result<()> {
    let addr = format!("127.0.0.1:{}", config.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "search daemon failed to bind");
            std::process::exit(1);
        }
    };

    registry.warmup_all().context("warming up retrievers")?;
    let pid_file = PidFile::write(&config.pid_path)?;
    tracing::info!(%addr, "search daemon listening");

    let registry = Arc::new(registry);
    let mut sigterm = signal_terminate()?;

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _peer)) => {
                        let registry = Arc::clone(&registry);
                        tokio::spawn(async move { handle_connection(stream, registry).await });
                    }
                    Err(e) => tracing::warn!(error = %e, "search daemon accept failed"),
                }
            }
            _ = sigterm.recv() => {
                tracing::info!("search daemon received SIGTERM, shutting down");
                break;
            }
        }
    }

    drop(pid_file);
    Ok(())
}

#[cfg(unix)]
fn signal_terminate() -> Result<tokio::signal::unix::Signal> {
    Ok(tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?)
}
