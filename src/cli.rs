// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `taskrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskrun",
    version,
    about = "Run a command, stream its output, and kill its whole process tree on Ctrl-C.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `$TASKRUN_CONFIG`, else `Taskrun.toml` in the current
    /// directory. A missing default file is not an error.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Working directory for the command (default: current directory).
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Kill the process tree if it is still running after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<f64>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the resolved invocation and environment overlay, but don't run.
    #[arg(long)]
    pub dry_run: bool,

    /// Program to run.
    #[arg(value_name = "EXECUTABLE")]
    pub executable: String,

    /// Arguments passed to the program verbatim.
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
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
