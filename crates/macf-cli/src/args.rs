use std::fmt;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum OutputFormat {
    Plain,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Plain => write!(f, "plain"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                LogLevel::Error => "error",
                LogLevel::Warn => "warn",
                LogLevel::Info => "info",
                LogLevel::Debug => "debug",
                LogLevel::Trace => "trace",
            }
        )
    }
}

#[derive(Parser)]
#[command(name = "macf")]
#[command(about = "Telemetry, state-reconstruction, and recovery substrate for an interactive LLM coding agent", long_about = None)]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Project root (defaults to MACEFF_AGENT_HOME_DIR, then cwd)")]
    pub project_root: Option<String>,

    #[arg(long, default_value = "plain", global = true)]
    pub format: OutputFormat,

    #[arg(long, default_value = "info", global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum StatuslineCommand {
    Install,
    Generate,
}

#[derive(Subcommand)]
pub enum HooksCommand {
    Install {
        #[arg(long, conflicts_with = "global")]
        local: bool,
        #[arg(long)]
        global: bool,
    },
    Test {
        #[arg(help = "Runner name, e.g. pre_tool_use")]
        runner: String,
        #[arg(long, help = "Path to a JSON file with the hook input; defaults to stdin")]
        input: Option<PathBuf>,
    },
    Logs {
        #[arg(long)]
        session: Option<String>,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    Status,
}

#[derive(Subcommand)]
pub enum BackupCommand {
    Create {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    List,
    Info {
        archive: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum RestoreCommand {
    Verify {
        archive: PathBuf,
        #[arg(long)]
        target: Option<PathBuf>,
    },
    Install {
        archive: PathBuf,
        #[arg(long)]
        target: Option<PathBuf>,
        #[arg(long)]
        transplant: bool,
        #[arg(long)]
        force: bool,
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
pub enum AgentCommand {
    Init,
    Backup {
        #[command(subcommand)]
        command: BackupCommand,
    },
    Restore {
        #[command(subcommand)]
        command: RestoreCommand,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    Init {
        #[arg(long)]
        force: bool,
    },
    Show,
}

#[derive(Subcommand)]
pub enum ClaudeConfigCommand {
    Init,
    Show,
}

#[derive(Subcommand)]
pub enum PolicyCommand {
    Manifest,
    Search {
        keywords: String,
    },
    Navigate {
        name: String,
    },
    Read {
        name: String,
        #[arg(long, value_name = "A:B")]
        lines: Option<String>,
        #[arg(long)]
        section: Option<usize>,
    },
    List,
    CaTypes,
    Recommend {
        question: String,
    },
    BuildIndex,
}

#[derive(Subcommand)]
pub enum EventsCommand {
    Show {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    History {
        #[arg(long, default_value = "50")]
        limit: usize,
    },
    Query {
        #[arg(long)]
        session: Option<String>,
        #[arg(long)]
        event: Option<String>,
        #[arg(long, default_value = "50")]
        limit: usize,
    },
    Sessions {
        #[command(subcommand)]
        command: SessionsCommand,
    },
    Stats,
    Gaps {
        #[arg(long, default_value = "300")]
        threshold: f64,
    },
}

#[derive(Subcommand)]
pub enum SessionsCommand {
    List,
}

#[derive(Subcommand)]
pub enum ModeCommand {
    Get,
    Set {
        #[arg(value_enum)]
        value: ModeValue,
        #[arg(long)]
        auth_token: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum ModeValue {
    AutoMode,
    ManualMode,
}

#[derive(Subcommand)]
pub enum TodosCommand {
    List {
        #[arg(short = 'p', long)]
        page: Option<usize>,
        #[arg(short = 'f', long, default_value = "all")]
        filter: String,
    },
    Status,
    AuthCollapse,
    AuthRestore,
    AuthItemEdit,
    AuthStatus,
}

#[derive(Subcommand)]
pub enum TaskCommand {
    List,
    Get {
        id: String,
    },
    Tree {
        id: String,
    },
    Edit {
        id: String,
        field: String,
        value: String,
    },
    EditMtmd {
        id: String,
        field: String,
        value: String,
    },
    AddMtmd {
        id: String,
        key: String,
        value: String,
    },
}

#[derive(Subcommand)]
pub enum SearchServiceCommand {
    Start {
        #[arg(long)]
        daemon: bool,
        #[arg(long)]
        port: Option<u16>,
    },
    Stop,
    Status,
}

#[derive(Subcommand)]
pub enum ProxyCommand {
    Start {
        #[arg(long)]
        daemon: bool,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long, help = "Real LLM backend base URL")]
        upstream: Option<String>,
    },
    Stop,
    Status,
    Stats,
    Log {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Print resolved environment variables and path overrides")]
    Env,

    #[command(about = "Print current time in the agent's configured timezone")]
    Time,

    #[command(about = "Print an estimate of remaining context budget for this turn")]
    Budget,

    #[command(about = "Print the reconstructed session operational state")]
    Context,

    #[command(about = "Manage the Claude Code statusline integration")]
    Statusline {
        #[command(subcommand)]
        command: StatuslineCommand,
    },

    #[command(about = "Print the current breadcrumb")]
    Breadcrumb {
        #[arg(long)]
        json: bool,
    },

    #[command(about = "Render a dev-drive summary for a given breadcrumb")]
    DevDrv {
        #[arg(long)]
        breadcrumb: String,
        #[arg(long)]
        raw: bool,
        #[arg(long)]
        md: bool,
        #[arg(long)]
        output: Option<PathBuf>,
    },

    #[command(about = "Install, test, and inspect the hook runners")]
    Hooks {
        #[command(subcommand)]
        command: HooksCommand,
    },

    #[command(about = "Agent lifecycle: init, backup, restore")]
    Agent {
        #[command(subcommand)]
        command: AgentCommand,
    },

    #[command(about = "Manage the policy manifest layer merge")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    #[command(about = "Manage the host agent's .claude/settings.local.json")]
    ClaudeConfig {
        #[command(subcommand)]
        command: ClaudeConfigCommand,
    },

    #[command(about = "Search and read the policy manifest")]
    Policy {
        #[command(subcommand)]
        command: PolicyCommand,
    },

    #[command(about = "Inspect the event log")]
    Events {
        #[command(subcommand)]
        command: EventsCommand,
    },

    #[command(about = "Read or set AUTO_MODE/MANUAL_MODE")]
    Mode {
        #[command(subcommand)]
        command: ModeCommand,
    },

    #[command(about = "Inspect and edit the host agent's todo list")]
    Todos {
        #[command(subcommand)]
        command: TodosCommand,
    },

    #[command(about = "Inspect and edit tasks in the task store")]
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },

    #[command(about = "Control the warm policy search daemon")]
    SearchService {
        #[command(subcommand)]
        command: SearchServiceCommand,
    },

    #[command(about = "Control the LLM-API reverse proxy")]
    Proxy {
        #[command(subcommand)]
        command: ProxyCommand,
    },
}
