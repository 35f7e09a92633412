// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `assetpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetpipe",
    version,
    about = "Run static-asset build tasks, optionally re-running them on file changes.",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run. Release stages (`images`, `styles`, `scripts`,
    /// `markup`) are ordinary tasks invoked one at a time, in order.
    #[arg(value_name = "TASK", default_value = "dev")]
    pub task: String,

    /// Path to the config file (TOML).
    ///
    /// Default: `Assetpipe.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Assetpipe.toml")]
    pub config: String,

    /// Stay resident after the task completes and re-run mapped tasks
    /// when watched files change.
    #[arg(long)]
    pub watch: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the resolved step plan, but don't execute.
    #[arg(long)]
    pub dry_run: bool,
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

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
