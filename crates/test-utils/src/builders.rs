#![allow(dead_code)]

use std::path::PathBuf;

use tend::command::{CommandSpec, PatternSet, WatchSpec};
use tend::config::{CommandConfig, RawConfigFile, SUPPORTED_VERSION, WatchConfig};

/// Builder for a validated `CommandSpec`, bypassing the config file.
pub struct CommandSpecBuilder {
    spec: CommandSpec,
    ready: Vec<String>,
    building: Vec<String>,
    failed: Vec<String>,
}

impl CommandSpecBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            spec: CommandSpec::new(name, name),
            ready: vec![],
            building: vec![],
            failed: vec![],
        }
    }

    pub fn command(mut self, cmd: &str) -> Self {
        self.spec.command = cmd.to_string();
        self
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.spec.args.push(arg.to_string());
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.spec.tags.push(tag.to_string());
        self
    }

    pub fn ready(mut self, pattern: &str) -> Self {
        self.ready.push(pattern.to_string());
        self
    }

    pub fn building(mut self, pattern: &str) -> Self {
        self.building.push(pattern.to_string());
        self
    }

    pub fn failed(mut self, pattern: &str) -> Self {
        self.failed.push(pattern.to_string());
        self
    }

    /// Add an install step. Its display name is namespaced by the chain.
    pub fn install(mut self, step: CommandSpec) -> Self {
        self.spec.install.push(step);
        self
    }

    pub fn watch(mut self, base_dir: impl Into<PathBuf>, path: &str) -> Self {
        let base_dir = base_dir.into();
        let watch = self.spec.watch.get_or_insert_with(|| WatchSpec {
            paths: vec![],
            ignored: vec![],
            base_dir,
        });
        watch.paths.push(path.to_string());
        self
    }

    pub fn build(mut self) -> CommandSpec {
        self.spec.patterns = PatternSet::compile(&self.ready, &self.building, &self.failed)
            .expect("test patterns must compile");
        self.spec
    }
}

/// Builder for `RawConfigFile`, for validation tests that skip TOML.
pub struct RawConfigBuilder {
    config: RawConfigFile,
}

impl RawConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                version: Some(SUPPORTED_VERSION.to_string()),
                commands: vec![],
                include: vec![],
            },
        }
    }

    pub fn version(mut self, version: Option<&str>) -> Self {
        self.config.version = version.map(str::to_string);
        self
    }

    pub fn include(mut self, pattern: &str) -> Self {
        self.config.include.push(pattern.to_string());
        self
    }

    pub fn command(mut self, cmd: CommandConfig) -> Self {
        self.config.commands.push(cmd);
        self
    }

    pub fn build(self) -> RawConfigFile {
        self.config
    }
}

impl Default for RawConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for one `[[commands]]` entry.
pub struct CommandConfigBuilder {
    cmd: CommandConfig,
}

impl CommandConfigBuilder {
    pub fn new(name: &str, command: &str) -> Self {
        Self {
            cmd: CommandConfig {
                name: Some(name.to_string()),
                command: command.to_string(),
                ..CommandConfig::default()
            },
        }
    }

    /// An install step without a name of its own.
    pub fn unnamed(command: &str) -> Self {
        Self {
            cmd: CommandConfig {
                command: command.to_string(),
                ..CommandConfig::default()
            },
        }
    }

    pub fn ready(mut self, pattern: &str) -> Self {
        self.cmd.ready.push(pattern.to_string());
        self
    }

    pub fn failed(mut self, pattern: &str) -> Self {
        self.cmd.failed.push(pattern.to_string());
        self
    }

    pub fn watch(mut self, watch: WatchConfig) -> Self {
        self.cmd.watch = Some(watch);
        self
    }

    pub fn install(mut self, step: CommandConfigBuilder) -> Self {
        self.cmd.install.push(step.build());
        self
    }

    pub fn build(self) -> CommandConfig {
        self.cmd
    }
}
