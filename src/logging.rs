// src/logging.rs

//! Logging for `taskrun` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `TASKRUN_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Logs are sent to STDERR so that stdout can carry the task's own output.
//!
//! This module also defines [`TaskLogger`], the narrow sink a
//! [`ProcessTask`](crate::exec::ProcessTask) writes its diagnostic lines to.

use anyhow::Result;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let level = match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => std::env::var("TASKRUN_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(tracing::Level::INFO),
    };

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

/// Diagnostic sink used by a running task.
///
/// Fire-and-forget: implementations must not block, and nothing they do can
/// fail the task.
pub trait TaskLogger: Send + Sync {
    fn debug(&self, message: &str);
}

/// [`TaskLogger`] that forwards to `tracing` at debug level, tagging every
/// line with the name of the component that owns the task.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    tag: String,
}

impl TracingLogger {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    /// Derive a logger whose tag is nested under this one (`parent.child`).
    pub fn child(&self, tag: &str) -> Self {
        Self {
            tag: format!("{}.{}", self.tag, tag),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl TaskLogger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "taskrun::task", task = %self.tag, "{}", message);
    }
}
