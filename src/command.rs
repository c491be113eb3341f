// src/command.rs

//! Validated, immutable description of a supervised command.
//!
//! These types are produced by [`crate::config`] and consumed by the
//! supervisor. Nothing here performs IO.

use std::collections::BTreeMap;
use std::path::PathBuf;

use regex::{RegexSet, RegexSetBuilder};

use crate::errors::{Result, TendError};
use crate::types::State;

/// One command to supervise, plus its install steps.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Display name. Install steps are shown as `<parent>:<name>`.
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub options: SpawnOptions,
    pub watch: Option<WatchSpec>,
    /// Run one at a time, in order, before the first start of this command.
    pub install: Vec<CommandSpec>,
    pub patterns: PatternSet,
    pub tags: Vec<String>,
}

impl CommandSpec {
    /// Minimal spec with no patterns, watch or install steps.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            options: SpawnOptions::default(),
            watch: None,
            install: Vec::new(),
            patterns: PatternSet::default(),
            tags: Vec::new(),
        }
    }

    /// Human-readable command line, used for logging and `--dry-run`.
    pub fn command_line(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Options applied when spawning the process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnOptions {
    /// Working directory, already resolved against the config directory.
    pub cwd: Option<PathBuf>,
    /// Extra environment variables on top of the inherited environment.
    pub env: BTreeMap<String, String>,
    /// Run `command args...` through the platform shell.
    pub shell: bool,
}

/// Which paths restart a command when they change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSpec {
    /// Paths or glob patterns as written in the config.
    pub paths: Vec<String>,
    /// Extra ignore globs; `**/node_modules/**` is always added on top.
    pub ignored: Vec<String>,
    /// Directory that relative `paths` are resolved against.
    pub base_dir: PathBuf,
}

/// Compiled `ready` / `building` / `failed` pattern lists.
///
/// All patterns are compiled case-insensitively.
#[derive(Debug, Clone)]
pub struct PatternSet {
    ready: RegexSet,
    building: RegexSet,
    failed: RegexSet,
}

impl Default for PatternSet {
    fn default() -> Self {
        Self {
            ready: RegexSet::empty(),
            building: RegexSet::empty(),
            failed: RegexSet::empty(),
        }
    }
}

impl PatternSet {
    pub fn compile(ready: &[String], building: &[String], failed: &[String]) -> Result<Self> {
        Ok(Self {
            ready: compile_list("ready", ready)?,
            building: compile_list("building", building)?,
            failed: compile_list("failed", failed)?,
        })
    }

    /// Classify a single line.
    ///
    /// Lists are tested in the fixed order ready, building, failed; the first
    /// list with a match decides. `None` means the line changes nothing.
    pub fn classify(&self, line: &str) -> Option<State> {
        if self.ready.is_match(line) {
            Some(State::Ready)
        } else if self.building.is_match(line) {
            Some(State::Building)
        } else if self.failed.is_match(line) {
            Some(State::Failed)
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ready.is_empty() && self.building.is_empty() && self.failed.is_empty()
    }
}

fn compile_list(kind: &str, patterns: &[String]) -> Result<RegexSet> {
    RegexSetBuilder::new(patterns)
        .case_insensitive(true)
        .build()
        .map_err(|e| TendError::ConfigError(format!("invalid `{kind}` pattern: {e}")))
}
