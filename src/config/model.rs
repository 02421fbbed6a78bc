// src/config/model.rs

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [cargo]
/// env = { RUSTFLAGS = "-D warnings", CARGO_TERM_COLOR = "always" }
/// ```
///
/// All sections are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    /// Settings from `[cargo]`.
    #[serde(default)]
    pub cargo: CargoSection,
}

/// `[cargo]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CargoSection {
    /// Extra environment variables merged over the inherited environment of
    /// every spawned process.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`) or
/// [`ConfigFile::empty`].
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    cargo: CargoSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(cargo: CargoSection) -> Self {
        Self { cargo }
    }

    /// Configuration with no overlay at all.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn cargo(&self) -> &CargoSection {
        &self.cargo
    }
}

/// Source of the environment overlay applied when spawning a process.
///
/// Read once per `ProcessTask::execute` call; implementations must not
/// assume anything about how often they are called.
pub trait Configuration: Send + Sync {
    /// Environment variables to merge over the inherited environment, or
    /// `None` when there is nothing to add.
    fn cargo_env(&self) -> Option<HashMap<String, String>>;
}

impl Configuration for ConfigFile {
    fn cargo_env(&self) -> Option<HashMap<String, String>> {
        if self.cargo.env.is_empty() {
            return None;
        }
        Some(
            self.cargo
                .env
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

/// In-memory configuration, for embedding the task runner without a file.
#[derive(Debug, Clone, Default)]
pub struct StaticConfiguration {
    env: Option<HashMap<String, String>>,
}

impl StaticConfiguration {
    pub fn new(env: Option<HashMap<String, String>>) -> Self {
        Self { env }
    }

    /// Build from `(key, value)` pairs.
    pub fn with_env<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let env = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self { env: Some(env) }
    }
}

impl Configuration for StaticConfiguration {
    fn cargo_env(&self) -> Option<HashMap<String, String>> {
        self.env.clone()
    }
}
