//! CLI argument parsing and command definitions

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// A companion-device entity panel for Home Assistant
#[derive(Debug, Parser)]
#[command(
    name = "hawatch",
    author,
    version,
    about = "A companion-device entity panel for Home Assistant",
    propagate_version = true,
    after_help = "Use 'hawatch <command> --help' for more information about a command."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Global options available to all commands
#[derive(Debug, Clone, Args)]
pub struct GlobalOpts {
    /// Output format (json, yaml, auto)
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        global = true,
        conflicts_with = "json"
    )]
    pub output_format: Option<OutputFormat>,

    /// Output as JSON (shorthand for -o json)
    #[arg(long, global = true)]
    pub json: bool,

    /// WebSocket URL of the paired companion process
    #[arg(short = 'p', long, env = "HAWATCH_PEER", global = true)]
    pub peer: Option<String>,

    /// Override the persisted settings file path
    #[arg(long, value_name = "PATH", env = "HAWATCH_SETTINGS", global = true)]
    pub settings: Option<PathBuf>,

    /// Override config file path
    #[arg(long, value_name = "PATH", env = "HAWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Reduce output to only errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase logging verbosity (stackable: -v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Enable debug logging (equivalent to -vv)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Enable trace logging
    #[arg(long, global = true)]
    pub trace: bool,

    /// Disable colored output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[non_exhaustive]
pub enum OutputFormat {
    Json,
    Yaml,
    Auto,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect to the companion and show the entity panel (default)
    Run,

    /// Inspect and manage the persisted settings record
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },

    /// Inspect and manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show the settings record as it would be loaded at startup
    Show,

    /// Print settings file path
    Path,

    /// Overwrite the settings file with the default record
    Reset,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show effective configuration
    Show,

    /// Print config file path
    Path,

    /// Get a specific configuration value
    Get {
        /// Configuration key (dot-separated path)
        key: Option<String>,
    },

    /// Reset configuration to defaults
    Reset,
}
