// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TendError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unsupported config version {0:?} (expected \"exp\")")]
    UnsupportedVersion(String),

    #[error("Supervisor for '{0}' was already started")]
    AlreadyStarted(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("File watch error: {0}")]
    WatchError(#[from] notify::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TendError>;
