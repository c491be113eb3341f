// src/lib.rs

pub mod cli;
pub mod command;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod manager;
pub mod supervisor;
pub mod types;
pub mod watch;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::command::CommandSpec;
use crate::config::load_and_validate;
use crate::manager::{IncludeFilter, StatusView, SupervisorManager, current_user, merge_filters};
use crate::supervisor::SupervisorContext;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and validation
/// - the include filter (config `include` plus CLI patterns)
/// - the manager with real processes and a `notify` watcher
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    apply_color_override();

    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let filters = merge_filters(cfg.include(), &args.filters);
    debug!(?filters, "effective include filter");

    if args.dry_run {
        let filter = IncludeFilter::new(&filters)?;
        let selected: Vec<&CommandSpec> =
            cfg.commands().iter().filter(|c| filter.matches(c)).collect();
        write_dry_run(&mut io::stdout().lock(), &selected)?;
        return Ok(());
    }

    let view = StatusView::new(io::stdout(), current_user());
    let manager = SupervisorManager::new(
        cfg.into_commands(),
        &filters,
        SupervisorContext::production(),
        view,
    )?;
    info!(commands = ?manager.names(), "starting supervisors");

    manager.run(ctrl_c()).await?;
    Ok(())
}

/// Resolves on the first Ctrl-C. If the signal handler cannot be installed
/// this never resolves and the process must be killed externally.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// `TEND_COLOR`: "true"/"1" forces colors on, "false"/"0" forces them off,
/// anything else leaves TTY detection to `colored`.
fn apply_color_override() {
    match std::env::var("TEND_COLOR").as_deref() {
        Ok("true" | "1") => colored::control::set_override(true),
        Ok("false" | "0") => colored::control::set_override(false),
        _ => {}
    }
}

/// Describe the selected commands without running anything.
pub fn write_dry_run<W: Write>(out: &mut W, commands: &[&CommandSpec]) -> io::Result<()> {
    writeln!(out, "tend dry-run")?;
    writeln!(out, "commands ({}):", commands.len())?;
    for cmd in commands {
        writeln!(out, "  - {}", cmd.name)?;
        writeln!(out, "      run: {}", cmd.command_line())?;
        if !cmd.tags.is_empty() {
            writeln!(out, "      tags: {}", cmd.tags.join(", "))?;
        }
        for step in &cmd.install {
            writeln!(out, "      install {}: {}", step.name, step.command_line())?;
        }
        if let Some(watch) = &cmd.watch {
            writeln!(out, "      watch: {}", watch.paths.join(", "))?;
            if !watch.ignored.is_empty() {
                writeln!(out, "      ignored: {}", watch.ignored.join(", "))?;
            }
        }
    }
    out.flush()
}
