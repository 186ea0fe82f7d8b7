//! Clap derive structures for the `carewatch` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// carewatch -- live view of a home-care sensor gateway
#[derive(Debug, Parser)]
#[command(
    name = "carewatch",
    version,
    about = "Monitor home-care sensors from the command line",
    long_about = "Follows the gateway's event socket (gas/smoke, panic button and fall\n\
        detector), raises alerts as conditions appear, and reads or acknowledges\n\
        the gateway's alert history.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Gateway profile to use
    #[arg(long, short = 'p', env = "CAREWATCH_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Event socket URL, e.g. ws://192.168.4.1:86/ws (overrides profile)
    #[arg(long, env = "CAREWATCH_URL", global = true)]
    pub url: Option<String>,

    /// Alert-history API base URL (defaults to the event socket's host)
    #[arg(long = "api", env = "CAREWATCH_API", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CAREWATCH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates on the history API
    #[arg(long, short = 'k', env = "CAREWATCH_INSECURE", global = true)]
    pub insecure: bool,

    /// HTTP request timeout in seconds
    #[arg(long, env = "CAREWATCH_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Follow live device state and alerts until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Browse and acknowledge the gateway's alert history
    #[command(alias = "a")]
    Alerts(AlertsArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Acknowledge each alert on screen as soon as it is shown
    #[arg(long)]
    pub dismiss: bool,

    /// Stop after this long (e.g. 90s, 10m); runs until Ctrl-C otherwise
    #[arg(long)]
    pub duration: Option<humantime::Duration>,

    /// Silence window before the link is declared dead (e.g. 15s)
    #[arg(long)]
    pub heartbeat: Option<humantime::Duration>,

    /// Reconnect attempts before giving up
    #[arg(long)]
    pub max_attempts: Option<u32>,
}

// ── Alerts ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AlertsArgs {
    #[command(subcommand)]
    pub command: AlertsCommand,
}

#[derive(Debug, Subcommand)]
pub enum AlertsCommand {
    /// List recorded alerts, newest as served by the gateway
    #[command(alias = "ls")]
    List {
        /// Only alerts nobody has acknowledged
        #[arg(long, conflicts_with = "acknowledged")]
        pending: bool,

        /// Only acknowledged alerts
        #[arg(long)]
        acknowledged: bool,

        /// Alert type, case-insensitive (PANICO, QUEDA, FUMACA, VAZAMENTO_GAS, ...)
        #[arg(long = "type", short = 't')]
        alert_type: Option<String>,

        /// Earliest timestamp, inclusive (YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)
        #[arg(long)]
        since: Option<String>,

        /// Latest timestamp, inclusive (YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)
        #[arg(long)]
        until: Option<String>,

        /// Show at most this many records
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// Acknowledge an alert
    #[command(alias = "acknowledge")]
    Ack {
        /// Alert id
        id: String,

        /// Name recorded as the acknowledging caregiver
        #[arg(long, short = 'u', env = "CAREWATCH_USER")]
        user: String,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive setup wizard
    Init,

    /// Display the resolved configuration
    Show,

    /// Print the config file location
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name
        name: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
