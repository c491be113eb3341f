// src/supervisor/mod.rs

//! Per-command supervision.
//!
//! A [`Supervisor`] owns one command. Once started it runs as its own tokio
//! task that:
//! - drains the command's install chain ([`install`]),
//! - spawns the command and classifies its output ([`classify`]),
//! - reports everything as [`SupervisorEvent`]s ([`events`]),
//! - kills and respawns the process tree when watched files change.
//!
//! The state machine itself lives in [`task`].

pub mod classify;
pub mod events;
pub mod install;
pub mod task;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::command::CommandSpec;
use crate::errors::{Result, TendError};
use crate::exec::{ProcessBackend, RealProcessBackend};
use crate::types::State;
use crate::watch::{ChangeWatcher, NotifyWatcher};

pub use events::{RestartHandle, SupervisorEvent};

use events::Control;
use task::SupervisorTask;

/// Fixed delay before a crashed command is respawned.
pub const RESTART_DELAY: Duration = Duration::from_secs(1);

/// How long a terminated process tree gets before it is killed outright.
pub const KILL_GRACE: Duration = Duration::from_secs(3);

/// Display name of an install step that does not declare one.
pub const DEFAULT_STEP_NAME: &str = "install";

const CONTROL_CHANNEL_CAPACITY: usize = 8;

/// External capabilities a supervisor needs, plus its timing knobs.
#[derive(Clone)]
pub struct SupervisorContext {
    pub backend: Arc<dyn ProcessBackend>,
    pub watcher: Arc<dyn ChangeWatcher>,
    pub restart_delay: Duration,
    pub kill_grace: Duration,
}

impl std::fmt::Debug for SupervisorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupervisorContext")
            .field("restart_delay", &self.restart_delay)
            .field("kill_grace", &self.kill_grace)
            .finish_non_exhaustive()
    }
}

impl SupervisorContext {
    pub fn new(backend: Arc<dyn ProcessBackend>, watcher: Arc<dyn ChangeWatcher>) -> Self {
        Self {
            backend,
            watcher,
            restart_delay: RESTART_DELAY,
            kill_grace: KILL_GRACE,
        }
    }

    /// Real processes and a `notify` watcher.
    pub fn production() -> Self {
        Self::new(Arc::new(RealProcessBackend::new()), Arc::new(NotifyWatcher::new()))
    }

    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = delay;
        self
    }

    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }
}

/// Whether a supervisor runs a command or one of its install steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    Main,
    InstallStep,
}

/// Supervisor for a single command.
///
/// Construct it, then call [`start`](Supervisor::start) exactly once.
#[derive(Debug)]
pub struct Supervisor {
    spec: Arc<CommandSpec>,
    role: Role,
    ctx: SupervisorContext,
    started: bool,
}

impl Supervisor {
    pub fn new(spec: CommandSpec, ctx: SupervisorContext) -> Self {
        Self::with_role(spec, Role::Main, ctx)
    }

    pub(crate) fn install_step(spec: CommandSpec, ctx: SupervisorContext) -> Self {
        Self::with_role(spec, Role::InstallStep, ctx)
    }

    fn with_role(spec: CommandSpec, role: Role, ctx: SupervisorContext) -> Self {
        Self {
            spec: Arc::new(spec),
            role,
            ctx,
            started: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    /// `Installing` when there are install steps to run first, otherwise
    /// `Initializing`.
    pub fn initial_state(&self) -> State {
        if self.spec.install.is_empty() {
            State::Initializing
        } else {
            State::Installing
        }
    }

    /// Start supervising, reporting to `events`.
    ///
    /// Spawns the supervisor task on the current tokio runtime. Fails with
    /// [`TendError::AlreadyStarted`] if called a second time; nothing is
    /// spawned in that case.
    pub fn start(&mut self, events: mpsc::Sender<SupervisorEvent>) -> Result<SupervisorHandle> {
        if self.started {
            return Err(TendError::AlreadyStarted(self.spec.name.clone()));
        }
        self.started = true;

        let (control_tx, control_rx) = mpsc::channel(CONTROL_CHANNEL_CAPACITY);
        let task = SupervisorTask::new(
            Arc::clone(&self.spec),
            self.role,
            self.initial_state(),
            self.ctx.clone(),
            events,
            control_tx.clone(),
            control_rx,
        );

        debug!(command = %self.spec.name, role = ?self.role, "starting supervisor");
        let task = tokio::spawn(task.run());

        Ok(SupervisorHandle {
            name: self.spec.name.clone(),
            control: control_tx,
            task,
        })
    }
}

/// Handle to a started supervisor task.
#[derive(Debug)]
pub struct SupervisorHandle {
    name: String,
    control: mpsc::Sender<Control>,
    task: JoinHandle<()>,
}

impl SupervisorHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Kill the live process tree (if any), stop watching and wait for the
    /// task to end.
    pub async fn shutdown(self) {
        if self.control.send(Control::Shutdown).await.is_err() {
            debug!(command = %self.name, "supervisor already stopped");
        }
        self.join().await;
    }

    /// Wait for the task to end on its own.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            warn!(command = %self.name, error = %e, "supervisor task panicked or was cancelled");
        }
    }
}
