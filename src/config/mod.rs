// src/config/mod.rs

//! Configuration loading and validation for tend.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate the version, names and patterns and compile them into
//!   [`crate::command::CommandSpec`]s (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{DEFAULT_CONFIG_FILE, config_root_dir, load_and_validate, load_from_path};
pub use model::{CommandConfig, ConfigFile, RawConfigFile, SpawnOptionsConfig, WatchConfig};
pub use validate::{validate_raw_config, SUPPORTED_VERSION};
