// src/config/mod.rs

//! Configuration loading and validation for taskrun.
//!
//! Responsibilities:
//! - Define the TOML-backed data model and the `Configuration` trait the
//!   task consumes (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate environment entries (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{CargoSection, ConfigFile, Configuration, RawConfigFile, StaticConfiguration};
pub use validate::validate_config;
