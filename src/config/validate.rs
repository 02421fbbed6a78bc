// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, TaskError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::TaskError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.cargo))
    }
}

/// Check that every `[cargo].env` entry can actually be passed to a child
/// process.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    for (key, value) in cfg.cargo.env.iter() {
        validate_env_key(key)?;
        if value.contains('\0') {
            return Err(TaskError::ConfigError(format!(
                "[cargo].env value for '{}' contains a NUL byte",
                key
            )));
        }
    }
    Ok(())
}

fn validate_env_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(TaskError::ConfigError(
            "[cargo].env contains an empty variable name".to_string(),
        ));
    }
    if key.contains('=') || key.contains('\0') {
        return Err(TaskError::ConfigError(format!(
            "[cargo].env variable name '{}' must not contain '=' or NUL",
            key.escape_default()
        )));
    }
    Ok(())
}
