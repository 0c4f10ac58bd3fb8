use anyhow::Result;

use crate::args::{Cli, Commands, StatuslineCommand};
use crate::handlers;
use crate::runtime::Runtime;

/// Dispatch a parsed `Cli` to its handler. No subcommand raises past this
/// point: `main` turns any `Err` into a stderr message and a non-zero exit.
pub fn run(cli: Cli) -> Result<()> {
    let rt = Runtime::open(cli.project_root.as_deref())?;
    let format = cli.format;

    match cli.command {
        None => {
            println!("macf: telemetry, state-reconstruction, and recovery substrate. Run with --help for subcommands.");
            Ok(())
        }
        Some(Commands::Env) => handlers::env::handle(&rt, format),
        Some(Commands::Time) => handlers::time::handle(format),
        Some(Commands::Budget) => handlers::budget::handle(&rt, format),
        Some(Commands::Context) => handlers::context::handle(&rt, format),
        Some(Commands::Statusline { command }) => match command {
            StatuslineCommand::Install => handlers::statusline::install(&rt),
            StatuslineCommand::Generate => handlers::statusline::generate(&rt),
        },
        Some(Commands::Breadcrumb { json }) => handlers::breadcrumb::handle(&rt, json),
        Some(Commands::DevDrv { breadcrumb, raw, md, output }) => {
            handlers::dev_drv::handle(&rt, &breadcrumb, raw, md, output.as_deref())
        }
        Some(Commands::Hooks { command }) => handlers::hooks::handle(&rt, command, format),
        Some(Commands::Agent { command }) => handlers::agent::handle(&rt, command, format),
        Some(Commands::Config { command }) => handlers::config::handle(&rt, command, format),
        Some(Commands::ClaudeConfig { command }) => handlers::claude_config::handle(&rt, command),
        Some(Commands::Policy { command }) => handlers::policy::handle(&rt, command, format),
        Some(Commands::Events { command }) => handlers::events::handle(&rt, command, format),
        Some(Commands::Mode { command }) => handlers::mode::handle(&rt, command, format),
        Some(Commands::Todos { command }) => handlers::todos::handle(&rt, command, format),
        Some(Commands::Task { command }) => handlers::task::handle(&rt, command, format),
        Some(Commands::SearchService { command }) => handlers::search_service::handle(&rt, command, format),
        Some(Commands::Proxy { command }) => handlers::proxy::handle(&rt, command, format),
    }
}
