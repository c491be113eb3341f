// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::config::DEFAULT_CONFIG_FILE;

/// Command-line arguments for `tend`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tend",
    version,
    about = "Run and babysit long-running dev commands.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TEND_LOG` or `warn` is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate the config and list what would run, without spawning anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Only run commands whose name or a tag matches one of these globs.
    ///
    /// Combined with the config's `include` list.
    #[arg(value_name = "PATTERN")]
    pub filters: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
