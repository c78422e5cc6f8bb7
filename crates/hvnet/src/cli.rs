//! Clap derive structures for the `hvnet` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// hvnet -- resolve and correlate Hyper-V virtual machine networks
#[derive(Debug, Parser)]
#[command(
    name = "hvnet",
    version,
    about = "Resolve Hyper-V VM networks onto virtual switches and guest adapters",
    long_about = "Plans the virtual switch, adapter slot and address configuration for each\n\
        network a machine declares, and correlates hypervisor adapters with guest\n\
        interfaces by MAC address.",
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
    /// Machine profile to use
    #[arg(long, short = 'm', env = "HVNET_MACHINE", global = true)]
    pub machine: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "HVNET_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format (defaults to `defaults.output` from the config)
    #[arg(long, short = 'o', env = "HVNET_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Take the first matching external switch instead of prompting
    #[arg(long, short = 'y', global = true, conflicts_with = "non_interactive")]
    pub yes: bool,

    /// Fail instead of prompting when a switch choice is ambiguous
    #[arg(long, global = true)]
    pub non_interactive: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
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
    /// Resolve the machine's networks against an inventory snapshot
    #[command(alias = "p")]
    Plan(PlanArgs),

    /// Correlate hypervisor adapter MACs with guest network adapters
    Map(MapArgs),

    /// Inspect CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),

    /// Print or install man pages
    Man(ManArgs),
}

// ── Plan ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PlanArgs {
    /// JSON snapshot with `managed`, `switches` and `host` inventories
    #[arg(long, short = 'i')]
    pub inventory: PathBuf,

    /// Provider name used in diagnostics
    #[arg(long, default_value = "hyperv")]
    pub provider: String,

    /// The host can serve DHCP on host-only networks
    #[arg(long)]
    pub dhcp_server: bool,
}

// ── Map ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MapArgs {
    /// JSON object of adapter reference to MAC address
    #[arg(long)]
    pub host_macs: PathBuf,

    /// JSON array of guest network adapters
    #[arg(long)]
    pub guest_nics: PathBuf,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display current resolved configuration
    Show,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

// ── Man ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ManArgs {
    /// Command whose page to print, e.g. `plan` or `config-show`
    pub command: Option<String>,

    /// Write every page into this directory instead of printing one
    #[arg(long, conflicts_with = "command")]
    pub out_dir: Option<PathBuf>,
}
