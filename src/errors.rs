// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("failed to spawn '{executable}': {source}")]
    Spawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    #[error("process '{executable}' was interrupted")]
    Interrupted { executable: String },

    #[error("task already started (state: {state})")]
    AlreadyStarted { state: String },

    #[error("failed to terminate process tree rooted at pid {pid}: {source}")]
    Kill {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("waiting for process failed: {0}")]
    Wait(#[source] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskError {
    /// True when the run ended because `kill()` was requested.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, TaskError::Interrupted { .. })
    }
}

pub type Result<T> = std::result::Result<T, TaskError>;
