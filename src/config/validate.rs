// src/config/validate.rs

use std::collections::HashSet;
use std::path::Path;

use globset::Glob;

use crate::command::{CommandSpec, PatternSet, SpawnOptions, WatchSpec};
use crate::config::model::{CommandConfig, ConfigFile, RawConfigFile, SpawnOptionsConfig};
use crate::errors::{Result, TendError};
use crate::supervisor::DEFAULT_STEP_NAME;

/// The only schema version this build understands.
pub const SUPPORTED_VERSION: &str = "exp";

/// Validate a raw config and compile it into [`CommandSpec`]s.
///
/// `base_dir` is the directory relative paths are resolved against (normally
/// the directory holding the config file).
pub fn validate_raw_config(raw: RawConfigFile, base_dir: &Path) -> Result<ConfigFile> {
    let version = validate_version(raw.version.as_deref())?;
    ensure_has_commands(&raw)?;
    validate_names(&raw)?;
    validate_globs("include", &raw.include)?;

    let commands = raw
        .commands
        .iter()
        .map(|c| {
            let name = c.name.as_deref().map(str::trim).unwrap_or_default();
            build_spec(name.to_string(), c, None, base_dir)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ConfigFile::new_unchecked(version, commands, raw.include))
}

fn validate_version(version: Option<&str>) -> Result<String> {
    match version {
        Some(SUPPORTED_VERSION) => Ok(SUPPORTED_VERSION.to_string()),
        Some(other) => Err(TendError::UnsupportedVersion(other.to_string())),
        None => Err(TendError::UnsupportedVersion("<missing>".to_string())),
    }
}

fn ensure_has_commands(cfg: &RawConfigFile) -> Result<()> {
    if cfg.commands.is_empty() {
        return Err(TendError::ConfigError(
            "config must contain at least one [[commands]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_names(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for (idx, cmd) in cfg.commands.iter().enumerate() {
        let name = match cmd.name.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n,
            _ => {
                return Err(TendError::ConfigError(format!(
                    "command #{} (`{}`) has no name",
                    idx + 1,
                    cmd.command
                )));
            }
        };
        if !seen.insert(name) {
            return Err(TendError::ConfigError(format!(
                "duplicate command name '{name}'"
            )));
        }
    }
    Ok(())
}

fn validate_globs(what: &str, patterns: &[String]) -> Result<()> {
    for pat in patterns {
        Glob::new(pat)
            .map_err(|e| TendError::ConfigError(format!("invalid {what} glob '{pat}': {e}")))?;
    }
    Ok(())
}

/// Build a spec for a command or, when `parent` is given, for one of its
/// install steps.
fn build_spec(
    name: String,
    cfg: &CommandConfig,
    parent: Option<&SpawnOptions>,
    base_dir: &Path,
) -> Result<CommandSpec> {
    let options = match (&cfg.options, parent) {
        (Some(opts), _) => resolve_options(opts, base_dir),
        (None, Some(inherited)) => inherited.clone(),
        (None, None) => SpawnOptions::default(),
    };

    let patterns = PatternSet::compile(&cfg.ready, &cfg.building, &cfg.failed)
        .map_err(|e| match e {
            TendError::ConfigError(msg) => TendError::ConfigError(format!("command '{name}': {msg}")),
            other => other,
        })?;

    let watch = match &cfg.watch {
        Some(w) => {
            let (paths, ignored) = w.clone().into_parts();
            validate_globs("watch", &paths)?;
            validate_globs("ignored", &ignored)?;
            let watch_base = options.cwd.clone().unwrap_or_else(|| base_dir.to_path_buf());
            Some(WatchSpec {
                paths,
                ignored,
                base_dir: watch_base,
            })
        }
        None => None,
    };

    let install = cfg
        .install
        .iter()
        .map(|step| {
            let step_name = step
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .unwrap_or(DEFAULT_STEP_NAME);
            build_spec(step_name.to_string(), step, Some(&options), base_dir)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CommandSpec {
        name,
        command: cfg.command.clone(),
        args: cfg.args.clone(),
        options,
        watch,
        install,
        patterns,
        tags: cfg.tags.clone(),
    })
}

fn resolve_options(cfg: &SpawnOptionsConfig, base_dir: &Path) -> SpawnOptions {
    SpawnOptions {
        cwd: cfg.cwd.as_ref().map(|cwd| {
            if cwd.is_absolute() {
                cwd.clone()
            } else {
                base_dir.join(cwd)
            }
        }),
        env: cfg.env.clone(),
        shell: cfg.shell,
    }
}
