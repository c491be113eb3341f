// src/manager/filter.rs

//! Include filter: which configured commands a run supervises.

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::command::CommandSpec;
use crate::errors::{Result, TendError};

/// Compiled include patterns.
///
/// Patterns are case-sensitive globs matched against a command's name and
/// each of its tags. An empty filter lets everything through.
#[derive(Debug, Clone, Default)]
pub struct IncludeFilter {
    set: Option<GlobSet>,
}

impl IncludeFilter {
    pub fn new(patterns: &[String]) -> Result<Self> {
        if patterns.is_empty() {
            return Ok(Self { set: None });
        }

        let mut builder = GlobSetBuilder::new();
        for pat in patterns {
            let glob = Glob::new(pat).map_err(|e| {
                TendError::ConfigError(format!("invalid include pattern '{pat}': {e}"))
            })?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .map_err(|e| TendError::ConfigError(format!("building include filter: {e}")))?;

        Ok(Self { set: Some(set) })
    }

    pub fn matches(&self, spec: &CommandSpec) -> bool {
        match &self.set {
            None => true,
            Some(set) => {
                set.is_match(&spec.name) || spec.tags.iter().any(|tag| set.is_match(tag))
            }
        }
    }
}

/// Union of config-declared and command-line patterns, first occurrence wins.
pub fn merge_filters(from_config: &[String], from_cli: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(from_config.len() + from_cli.len());
    for pat in from_config.iter().chain(from_cli) {
        if !merged.contains(pat) {
            merged.push(pat.clone());
        }
    }
    merged
}
