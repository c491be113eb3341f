// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher, GlobSet, GlobSetBuilder};

use crate::command::WatchSpec;
use crate::errors::{Result, TendError};
use crate::watch::path_utils::relative_str;

/// Ignore globs applied to every watch, on top of the configured ones.
///
/// Dependency trees churn during installs and would otherwise restart the
/// command over and over.
pub const DEFAULT_IGNORED: &[&str] = &["**/node_modules/**"];

/// One watched location.
///
/// A plain path (`"src"`, `"Cargo.toml"`) matches itself and everything below
/// it. A glob (`"src/**/*.rs"`) is split into its literal base directory,
/// which is what gets registered with the OS, and a matcher for paths
/// relative to that base.
#[derive(Clone)]
pub struct WatchTarget {
    root: PathBuf,
    pattern: Option<GlobMatcher>,
}

impl fmt::Debug for WatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchTarget")
            .field("root", &self.root)
            .field("pattern", &self.pattern.as_ref().map(|m| m.glob().glob()))
            .finish()
    }
}

impl WatchTarget {
    /// Path to register with the OS watcher.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn matches(&self, path: &Path) -> bool {
        match &self.pattern {
            None => relative_str(&self.root, path).is_some(),
            Some(matcher) => {
                relative_str(&self.root, path).is_some_and(|rel| matcher.is_match(rel))
            }
        }
    }
}

/// Compiled form of a [`WatchSpec`].
#[derive(Clone)]
pub struct WatchProfile {
    base_dir: PathBuf,
    targets: Vec<WatchTarget>,
    ignored: GlobSet,
}

impl fmt::Debug for WatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchProfile")
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}

impl WatchProfile {
    pub fn from_spec(spec: &WatchSpec) -> Result<Self> {
        let base_dir = canonical_or_given(&spec.base_dir);

        let targets = spec
            .paths
            .iter()
            .map(|p| build_target(&base_dir, p))
            .collect::<Result<Vec<_>>>()?;

        let ignored = build_globset(
            DEFAULT_IGNORED
                .iter()
                .copied()
                .chain(spec.ignored.iter().map(String::as_str)),
        )?;

        Ok(Self {
            base_dir,
            targets,
            ignored,
        })
    }

    pub fn targets(&self) -> &[WatchTarget] {
        &self.targets
    }

    /// True if `path` is excluded, either as an absolute path or relative to
    /// the base directory.
    pub fn is_ignored(&self, path: &Path) -> bool {
        if self.ignored.is_match(path) {
            return true;
        }
        relative_str(&self.base_dir, path).is_some_and(|rel| self.ignored.is_match(rel))
    }

    /// True if a change to `path` should restart the command.
    pub fn matches(&self, path: &Path) -> bool {
        !self.is_ignored(path) && self.targets.iter().any(|t| t.matches(path))
    }
}

fn build_target(base_dir: &Path, raw: &str) -> Result<WatchTarget> {
    let (literal, glob) = split_glob(raw);

    let root = if literal.is_empty() {
        base_dir.to_path_buf()
    } else if Path::new(&literal).is_absolute() {
        PathBuf::from(&literal)
    } else {
        base_dir.join(&literal)
    };
    let root = canonical_or_given(&root);

    let pattern = match glob {
        Some(g) => Some(
            Glob::new(&g)
                .map_err(|e| TendError::ConfigError(format!("invalid watch glob '{raw}': {e}")))?
                .compile_matcher(),
        ),
        None => None,
    };

    Ok(WatchTarget { root, pattern })
}

/// Split `"src/**/*.rs"` into `("src", Some("**/*.rs"))`.
///
/// Everything up to the first component containing a glob metacharacter is
/// the literal part.
pub fn split_glob(raw: &str) -> (String, Option<String>) {
    let normalised = raw.replace('\\', "/");
    let components: Vec<&str> = normalised.split('/').collect();

    match components.iter().position(|c| has_glob_meta(c)) {
        None => (normalised.trim_end_matches('/').to_string(), None),
        Some(idx) => {
            let literal = components[..idx].join("/");
            let rest = components[idx..].join("/");
            (literal, Some(rest))
        }
    }
}

fn has_glob_meta(component: &str) -> bool {
    component.contains(['*', '?', '[', '{'])
}

fn canonical_or_given(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Build a GlobSet from simple string patterns.
fn build_globset<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat)
            .map_err(|e| TendError::ConfigError(format!("invalid ignore glob '{pat}': {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| TendError::ConfigError(format!("building ignore globset: {e}")))
}
