use std::collections::BTreeMap;

use anyhow::{Context, Result};
use macf_proxy::ProxyConfig;
use macf_search_daemon::PidFile;

use crate::args::{OutputFormat, ProxyCommand};
use crate::runtime::{print_json, Runtime};

pub fn handle(rt: &Runtime, command: ProxyCommand, format: OutputFormat) -> Result<()> {
    match command {
        ProxyCommand::Start { daemon, port, upstream } => start(rt, daemon, port, upstream.as_deref()),
        ProxyCommand::Stop => stop(rt),
        ProxyCommand::Status => status(rt, format),
        ProxyCommand::Stats => stats(rt, format),
        ProxyCommand::Log { limit } => log(rt, limit, format),
    }
}

fn start(rt: &Runtime, daemon: bool, port: Option<u16>, upstream: Option<&str>) -> Result<()> {
    let upstream = upstream.unwrap_or("https://api.anthropic.com").to_string();
    if daemon {
        return spawn_detached(rt, port, &upstream);
    }
    let config = ProxyConfig::new(&rt.project_root, upstream, port);
    let active = macf_projections::active_tasks_from_filesystem(&rt.session_tasks_dir(&rt.current_session_id()?.unwrap_or_default())).unwrap_or_default();
    let manifest = rt.load_manifest()?;
    let expected = macf_projections::expected_policies_for_active_tasks(&active, &manifest);
    let runtime = tokio::runtime::Runtime::new().context("building tokio runtime")?;
    runtime.block_on(macf_proxy::lifecycle::run(config, expected))
}

fn spawn_detached(rt: &Runtime, port: Option<u16>, upstream: &str) -> Result<()> {
    let exe = std::env::current_exe().context("resolving current executable")?;
    let mut command = std::process::Command::new(exe);
    command.arg("--project-root").arg(&rt.project_root).arg("proxy").arg("start").arg("--upstream").arg(upstream);
    if let Some(port) = port {
        command.arg("--port").arg(port.to_string());
    }
    command.stdin(std::process::Stdio::null()).stdout(std::process::Stdio::null()).stderr(std::process::Stdio::null());
    let child = command.spawn().context("spawning detached proxy")?;
    println!("proxy started, pid {}", child.id());
    Ok(())
}

fn pid_path(rt: &Runtime) -> std::path::PathBuf {
    rt.macf_dir().join("proxy.pid")
}

fn stop(rt: &Runtime) -> Result<()> {
    let path = pid_path(rt);
    let Some(pid) = PidFile::read(&path) else {
        println!("no proxy pid file at {}", path.display());
        return Ok(());
    };
    send_terminate(pid)?;
    let _ = std::fs::remove_file(&path);
    println!("sent SIGTERM to proxy pid {pid}");
    Ok(())
}

fn status(rt: &Runtime, format: OutputFormat) -> Result<()> {
    let path = pid_path(rt);
    let pid = PidFile::read(&path);
    let running = pid.map(is_alive).unwrap_or(false);
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "running": running, "pid": pid })),
        OutputFormat::Plain => {
            match pid {
                Some(pid) if running => println!("proxy running, pid {pid}"),
                Some(pid) => println!("pid file present ({pid}) but process is not running"),
                None => println!("proxy not running"),
            }
            Ok(())
        }
    }
}

/// Tally of `api_request`/`api_response` lines in `agent_api_log.jsonl`.
/// The live injection/mode-rewrite counters only exist inside the running
/// process; this reports what actually hit the log.
fn stats(rt: &Runtime, format: OutputFormat) -> Result<()> {
    let path = macf_core::path::resolve_proxy_log_path(&rt.project_root);
    let mut tallies: BTreeMap<String, u64> = BTreeMap::new();
    if let Ok(contents) = std::fs::read_to_string(&path) {
        for line in contents.lines() {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(line) {
                if let Some(record_type) = value.get("type").and_then(|v| v.as_str()) {
                    *tallies.entry(record_type.to_string()).or_default() += 1;
                }
            }
        }
    }
    match format {
        OutputFormat::Json => print_json(&tallies),
        OutputFormat::Plain => {
            for (record_type, count) in &tallies {
                println!("{record_type}: {count}");
            }
            Ok(())
        }
    }
}

fn log(rt: &Runtime, limit: usize, format: OutputFormat) -> Result<()> {
    let path = macf_core::path::resolve_proxy_log_path(&rt.project_root);
    let contents = std::fs::read_to_string(&path).unwrap_or_default();
    let lines: Vec<&str> = contents.lines().collect();
    let start = lines.len().saturating_sub(limit);
    let selected = &lines[start..];
    match format {
        OutputFormat::Json => {
            let records: Vec<serde_json::Value> = selected.iter().filter_map(|l| serde_json::from_str(l).ok()).collect();
            print_json(&records)
        }
        OutputFormat::Plain => {
            for line in selected {
                println!("{line}");
            }
            Ok(())
        }
    }
}

#[cfg(unix)]
fn send_terminate(pid: u32) -> Result<()> {
    let result = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if result != 0 {
        anyhow::bail!("failed to signal pid {pid}: {}", std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
fn send_terminate(_pid: u32) -> Result<()> {
    anyhow::bail!("stopping a daemon by pid is only supported on unix")
}

#[cfg(unix)]
fn is_alive(pid: u32) -> bool {
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(not(unix))]
fn is_alive(_pid: u32) -> bool {
    false
}
