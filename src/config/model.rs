// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::command::CommandSpec;

/// Configuration exactly as read from a TOML file, before validation.
///
/// ```toml
/// version = "exp"
/// include = ["*-svc"]
///
/// [[commands]]
/// name = "api-svc"
/// command = "cargo"
/// args = ["run"]
/// ready = ["Listening on"]
/// watch = "src"
///
/// [[commands.install]]
/// command = "cargo"
/// args = ["build"]
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Schema version; only `"exp"` is accepted.
    #[serde(default)]
    pub version: Option<String>,

    /// All commands from `[[commands]]`.
    #[serde(default)]
    pub commands: Vec<CommandConfig>,

    /// Include filter globs, unioned with any given on the command line.
    #[serde(default)]
    pub include: Vec<String>,
}

/// `[[commands]]` entry. Install steps (`[[commands.install]]`) use the same
/// shape, except that `name` is optional there.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CommandConfig {
    #[serde(default)]
    pub name: Option<String>,

    /// Executable to run.
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Spawn options. Install steps without options inherit the parent's.
    #[serde(default)]
    pub options: Option<SpawnOptionsConfig>,

    #[serde(default)]
    pub watch: Option<WatchConfig>,

    /// Output patterns that move the command to `building`.
    #[serde(default)]
    pub building: Vec<String>,

    /// Output patterns that move the command to `ready`.
    #[serde(default)]
    pub ready: Vec<String>,

    /// Output patterns that move the command to `failed`.
    #[serde(default)]
    pub failed: Vec<String>,

    /// Steps run once, in order, before the first start.
    #[serde(default)]
    pub install: Vec<CommandConfig>,

    /// Extra names the include filter matches against.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// `options = { ... }` table.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SpawnOptionsConfig {
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub shell: bool,
}

/// `watch` accepts a single path, a list of paths or a table.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum WatchConfig {
    Path(String),
    Paths(Vec<String>),
    Detailed {
        paths: Vec<String>,
        #[serde(default)]
        ignored: Vec<String>,
    },
}

impl WatchConfig {
    /// Split into `(paths, ignored)`.
    pub fn into_parts(self) -> (Vec<String>, Vec<String>) {
        match self {
            WatchConfig::Path(p) => (vec![p], Vec::new()),
            WatchConfig::Paths(paths) => (paths, Vec::new()),
            WatchConfig::Detailed { paths, ignored } => (paths, ignored),
        }
    }
}

/// Validated configuration.
///
/// Only constructed through [`crate::config::validate::validate_raw_config`],
/// so every command is known to have a unique name and compiled patterns.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    version: String,
    commands: Vec<CommandSpec>,
    include: Vec<String>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        version: String,
        commands: Vec<CommandSpec>,
        include: Vec<String>,
    ) -> Self {
        Self {
            version,
            commands,
            include,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }

    pub fn include(&self) -> &[String] {
        &self.include
    }

    pub fn into_commands(self) -> Vec<CommandSpec> {
        self.commands
    }
}
