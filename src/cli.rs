//! CLI arguments and subcommands for herakles-process-control.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "herakles-process-control",
    about = "Process metrics endpoint with a durable, reconciled kill list",
    long_about = "Process metrics endpoint with a durable, reconciled kill list.\n\n\
                  Serves live per-process CPU and memory utilization, kills single \
                  processes on request, and keeps a persistent kill list that is \
                  reconciled against the process table on demand or on a timer.",
    author = "Michael Moll <exporter@herakles.now> - Herakles",
    version = "0.1.0",
    propagate_version = true,
    after_help = "Project: https://github.com/cansp-dev/herakles-process-control | More info: https://www.herakles.now | Support: exporter@herakles.now"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Log level (overrides log_level from the config file; default info)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Path of the kill-list JSON document
    #[arg(short = 'k', long)]
    pub kill_list: Option<PathBuf>,

    /// procfs mount to enumerate processes from
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Run a reconciliation pass every N seconds (0 = only on request)
    #[arg(long)]
    pub reconcile_interval: Option<u64>,

    /// Disable /health endpoint
    #[arg(long)]
    pub disable_health: bool,

    /// Disable /metrics endpoint and request telemetry
    #[arg(long)]
    pub disable_telemetry: bool,

    /// Enable TLS/SSL for HTTPS
    #[arg(long)]
    pub enable_tls: bool,

    /// Path to TLS certificate file (PEM format)
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// Path to TLS private key file (PEM format)
    #[arg(long)]
    pub tls_key: Option<PathBuf>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration and system requirements
    Check,

    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Run one kill-list reconciliation pass and print the report
    Reconcile,

    /// Inspect or edit the kill list
    KillList {
        #[command(subcommand)]
        action: KillListCommand,
    },
}

/// Kill-list subcommands
#[derive(Subcommand, Debug)]
pub enum KillListCommand {
    /// Print the current kill list
    Show,

    /// Add a PID to the kill list
    Add {
        /// Process ID
        pid: String,

        /// Human-readable label stored with the entry
        #[arg(short = 'l', long)]
        label: Option<String>,
    },

    /// Remove a PID from the kill list
    Remove {
        /// Process ID
        pid: String,
    },
}
