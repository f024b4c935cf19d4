//! CLI arguments and subcommands for herakles-proc-sampler.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
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

/// Output formats for sampled processes
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
    Toml,
    Prometheus,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "herakles-proc-sampler",
    about = "Per-process CPU and memory sampler for Linux /proc",
    long_about = "Per-process CPU and memory sampler for Linux /proc.\n\n\
                  Reads /proc/<pid>/stat and /proc/<pid>/statm once per interval, \
                  derives CPU utilization against the system-wide CPU baseline and \
                  reports it per process.",
    author = "Michael Moll <exporter@herakles.now> - Herakles",
    version = "0.1.0",
    propagate_version = true,
    after_help = "Project: https://github.com/cansp-dev/herakles-node-exporter — More info: https://www.herakles.now — Support: exporter@herakles.now"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log level (overrides log_level from the config file)
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

    /// Root of the proc filesystem
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Seconds between two samples
    #[arg(short = 'i', long)]
    pub interval: Option<u64>,

    /// Include only processes matching these names (comma-separated)
    #[arg(long)]
    pub include_names: Option<String>,

    /// Exclude processes matching these names (comma-separated)
    #[arg(long)]
    pub exclude_names: Option<String>,

    /// Maximum number of processes to track
    #[arg(long)]
    pub max_processes: Option<usize>,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sample processes periodically until interrupted
    Watch {
        /// Process IDs to watch
        pids: Vec<i32>,

        /// Watch every process below the proc root
        #[arg(long, conflicts_with = "pids")]
        all: bool,

        /// Stop after N cycles (0 = until interrupted)
        #[arg(short = 'n', long)]
        iterations: Option<u64>,
    },

    /// Take two samples of one process and print the result
    Sample {
        /// Process ID
        pid: i32,

        /// Thread ID within the process
        #[arg(long)]
        tid: Option<i32>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: OutputFormat,
    },

    /// Terminate a process, escalating to sudo if needed
    Kill {
        /// Process ID
        pid: i32,

        /// Do not retry through sudo
        #[arg(long)]
        no_sudo: bool,
    },

    /// Check runtime requirements and permissions
    Check,
}
