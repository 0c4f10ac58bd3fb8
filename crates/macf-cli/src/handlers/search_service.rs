use anyhow::{Context, Result};
use macf_search_daemon::{DaemonConfig, PidFile, PolicyRetriever, Registry};

use crate::args::{OutputFormat, SearchServiceCommand};
use crate::runtime::{print_json, Runtime};

pub fn handle(rt: &Runtime, command: SearchServiceCommand, format: OutputFormat) -> Result<()> {
    match command {
        SearchServiceCommand::Start { daemon, port } => start(rt, daemon, port),
        SearchServiceCommand::Stop => stop(rt),
        SearchServiceCommand::Status => status(rt, format),
    }
}

fn start(rt: &Runtime, daemon: bool, port: Option<u16>) -> Result<()> {
    let pid_path = rt.search_daemon_pid_path();
    if daemon {
        return spawn_detached(rt, port, &pid_path);
    }
    let manifest = rt.load_manifest()?;
    let mut db = macf_policy::Database::open_in_memory().context("opening in-memory policy index")?;
    db.build_index(&manifest).context("building policy index")?;
    let mut registry = Registry::new();
    registry.register(Box::new(PolicyRetriever::new(db, manifest)));
    let mut config = DaemonConfig::new(pid_path);
    if let Some(port) = port {
        config.port = port;
    }
    let runtime = tokio::runtime::Runtime::new().context("building tokio runtime")?;
    runtime.block_on(macf_search_daemon::run(config, registry))
}

fn spawn_detached(rt: &Runtime, port: Option<u16>, pid_path: &std::path::Path) -> Result<()> {
    let exe = std::env::current_exe().context("resolving current executable")?;
    let mut command = std::process::Command::new(exe);
    command.arg("--project-root").arg(&rt.project_root).arg("search-service").arg("start");
    if let Some(port) = port {
        command.arg("--port").arg(port.to_string());
    }
    command.stdin(std::process::Stdio::null()).stdout(std::process::Stdio::null()).stderr(std::process::Stdio::null());
    let child = command.spawn().context("spawning detached search daemon")?;
    println!("search daemon started, pid {} (pid file: {})", child.id(), pid_path.display());
    Ok(())
}

fn stop(rt: &Runtime) -> Result<()> {
    let pid_path = rt.search_daemon_pid_path();
    let Some(pid) = PidFile::read(&pid_path) else {
        println!("no search daemon pid file at {}", pid_path.display());
        return Ok(());
    };
    send_terminate(pid)?;
    let _ = std::fs::remove_file(&pid_path);
    println!("sent SIGTERM to search daemon pid {pid}");
    Ok(())
}

fn status(rt: &Runtime, format: OutputFormat) -> Result<()> {
    let pid_path = rt.search_daemon_pid_path();
    let pid = PidFile::read(&pid_path);
    let running = pid.map(is_alive).unwrap_or(false);
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "running": running, "pid": pid })),
        OutputFormat::Plain => {
            match pid {
                Some(pid) if running => println!("search daemon running, pid {pid}"),
                Some(pid) => println!("pid file present ({pid}) but process is not running"),
                None => println!("search daemon not running"),
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
