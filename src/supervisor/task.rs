// src/supervisor/task.rs

//! The supervisor task: one command's state machine.
//!
//! Everything a supervisor does happens on this single task, so its own state
//! needs no locking. The loop reacts to three sources:
//! - control requests (respawn after a crash, shutdown),
//! - change events from the watcher (kill the tree, respawn at once),
//! - output and exit of the live process.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::command::CommandSpec;
use crate::exec::{ProcessEvent, SpawnedProcess};
use crate::supervisor::classify::classify_lines;
use crate::supervisor::events::{Control, RestartHandle, SupervisorEvent};
use crate::supervisor::install::{ChainOutcome, InstallChain};
use crate::supervisor::{Role, SupervisorContext};
use crate::types::{OutputStream, RestartReason, State};
use crate::watch::path_utils::display_path;
use crate::watch::{ChangeEvent, WatchSubscription};

/// Whether the task keeps running after handling something.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Finished,
}

pub(crate) struct SupervisorTask {
    spec: Arc<CommandSpec>,
    role: Role,
    state: State,
    ctx: SupervisorContext,
    events: mpsc::Sender<SupervisorEvent>,
    control_tx: mpsc::Sender<Control>,
    control_rx: mpsc::Receiver<Control>,
    /// Present only while a process is live.
    process: Option<SpawnedProcess>,
    watch: Option<WatchSubscription>,
    /// Subscribing is attempted once, after the first successful spawn.
    watch_attempted: bool,
}

impl SupervisorTask {
    pub(crate) fn new(
        spec: Arc<CommandSpec>,
        role: Role,
        initial_state: State,
        ctx: SupervisorContext,
        events: mpsc::Sender<SupervisorEvent>,
        control_tx: mpsc::Sender<Control>,
        control_rx: mpsc::Receiver<Control>,
    ) -> Self {
        Self {
            spec,
            role,
            state: initial_state,
            ctx,
            events,
            control_tx,
            control_rx,
            process: None,
            watch: None,
            watch_attempted: false,
        }
    }

    pub(crate) async fn run(mut self) {
        if !self.spec.install.is_empty() {
            let chain = InstallChain::new(&self.spec, self.ctx.clone());
            match chain.run(&self.events, &mut self.control_rx).await {
                ChainOutcome::Completed => {
                    info!(command = %self.spec.name, "install steps complete");
                }
                ChainOutcome::Failed(code) => {
                    self.install_failed(code).await;
                    return;
                }
                ChainOutcome::Cancelled => return,
            }
        }

        if self.spawn().await == Flow::Finished {
            return;
        }

        loop {
            tokio::select! {
                control = self.control_rx.recv() => match control {
                    Some(Control::Respawn) => {
                        if self.respawn().await == Flow::Finished {
                            return;
                        }
                    }
                    Some(Control::Shutdown) | None => {
                        self.shutdown().await;
                        return;
                    }
                },
                change = next_change(&mut self.watch) => {
                    self.reload(change).await;
                }
                event = next_process_event(&mut self.process) => {
                    if self.handle_process_event(event).await == Flow::Finished {
                        return;
                    }
                }
            }
        }
    }

    /// An install step exited non-zero: report a terminal close with no
    /// restart, then idle until shutdown.
    async fn install_failed(&mut self, code: i32) {
        warn!(command = %self.spec.name, exit_code = code, "install step failed; not starting");
        self.set_state(State::Closed).await;
        let name = self.spec.name.clone();
        self.emit(SupervisorEvent::Closed {
            name,
            code,
            restart: None,
        })
        .await;

        while let Some(control) = self.control_rx.recv().await {
            if control == Control::Shutdown {
                break;
            }
        }
    }

    /// Spawn the command. A spawn error counts as an exit with code -1.
    async fn spawn(&mut self) -> Flow {
        debug_assert!(self.process.is_none(), "one live process per supervisor");
        self.set_state(State::Initializing).await;

        match self.ctx.backend.spawn(&self.spec) {
            Ok(process) => {
                debug!(command = %self.spec.name, pid = ?process.pid, "process spawned");
                self.process = Some(process);
                self.ensure_watching();
                Flow::Continue
            }
            Err(e) => {
                error!(command = %self.spec.name, error = %e, "failed to spawn process");
                self.emit_output(OutputStream::Stderr, format!("failed to start: {e}"))
                    .await;
                self.handle_exit(-1, RestartReason::Crash).await
            }
        }
    }

    async fn respawn(&mut self) -> Flow {
        if self.process.is_some() {
            debug!(command = %self.spec.name, "already running; ignoring respawn request");
            return Flow::Continue;
        }
        info!(command = %self.spec.name, "restarting");
        self.spawn().await
    }

    fn ensure_watching(&mut self) {
        if self.role != Role::Main || self.watch_attempted {
            return;
        }
        let Some(spec) = &self.spec.watch else {
            return;
        };
        self.watch_attempted = true;

        match self.ctx.watcher.subscribe(&self.spec.name, spec) {
            Ok(subscription) => self.watch = Some(subscription),
            Err(e) => {
                warn!(command = %self.spec.name, error = %e, "could not start watching; autoreload disabled");
            }
        }
    }

    /// A watched file changed: kill the whole tree and respawn right away.
    ///
    /// The kill is not a crash, so it produces no `Closed` event.
    async fn reload(&mut self, change: ChangeEvent) {
        if let Some(watch) = self.watch.as_mut() {
            let coalesced = watch.drain_pending();
            if coalesced > 0 {
                debug!(command = %self.spec.name, coalesced, "coalesced queued change events");
            }
        }

        let shown = match &self.spec.watch {
            Some(w) => display_path(&w.base_dir, &change.path),
            None => change.path.display().to_string(),
        };
        info!(command = %self.spec.name, path = %shown, "change detected; reloading");
        self.emit_output(
            OutputStream::Stdout,
            format!("[autoreload] change detected in {shown}, restarting"),
        )
        .await;

        if let Some(code) = self.terminate().await {
            self.handle_exit(code, RestartReason::WatchTriggered).await;
        }
        // Only main commands watch, and for them a failed spawn is a crash
        // that keeps the task alive.
        let flow = self.spawn().await;
        debug_assert_eq!(flow, Flow::Continue);
    }

    async fn handle_process_event(&mut self, event: ProcessEvent) -> Flow {
        match event {
            ProcessEvent::Output { stream, data } => {
                self.handle_output(stream, data).await;
                Flow::Continue
            }
            ProcessEvent::Exited(code) => {
                self.process = None;
                self.handle_exit(code, RestartReason::Crash).await
            }
        }
    }

    async fn handle_output(&mut self, stream: OutputStream, data: String) {
        let transitions: Vec<State> = classify_lines(&self.spec.patterns, &data).collect();
        self.emit_output(stream, data).await;
        for state in transitions {
            self.set_state(state).await;
        }
    }

    /// Exit handler.
    async fn handle_exit(&mut self, code: i32, reason: RestartReason) -> Flow {
        if reason == RestartReason::WatchTriggered {
            debug!(command = %self.spec.name, exit_code = code, "planned exit after change");
            return Flow::Continue;
        }

        let name = self.spec.name.clone();
        match self.role {
            Role::InstallStep if code == 0 => {
                info!(command = %name, "install step complete");
                self.set_state(State::Complete).await;
                Flow::Finished
            }
            Role::InstallStep => {
                warn!(command = %name, exit_code = code, "install step failed");
                self.set_state(State::Closed).await;
                self.emit(SupervisorEvent::Closed {
                    name,
                    code,
                    restart: None,
                })
                .await;
                Flow::Finished
            }
            Role::Main => {
                warn!(command = %name, exit_code = code, "process exited unexpectedly");
                self.set_state(State::Closed).await;
                let restart = RestartHandle::new(self.control_tx.clone(), self.ctx.restart_delay);
                self.emit(SupervisorEvent::Closed {
                    name,
                    code,
                    restart: Some(restart),
                })
                .await;
                Flow::Continue
            }
        }
    }

    /// Terminate the live process tree and wait for its exit code.
    ///
    /// Returns `None` when nothing was running.
    async fn terminate(&mut self) -> Option<i32> {
        let mut process = self.process.take()?;
        let grace = self.ctx.kill_grace;

        if let Err(e) = process.killer.kill_tree(false) {
            warn!(command = %self.spec.name, error = %e, "failed to signal process tree");
        }
        if let Ok(code) = timeout(grace, self.wait_for_exit(&mut process.events)).await {
            return Some(code);
        }

        warn!(command = %self.spec.name, "process tree ignored termination; killing");
        if let Err(e) = process.killer.kill_tree(true) {
            warn!(command = %self.spec.name, error = %e, "failed to kill process tree");
        }
        match timeout(grace, self.wait_for_exit(&mut process.events)).await {
            Ok(code) => Some(code),
            Err(_) => {
                error!(command = %self.spec.name, "process tree did not exit after kill; abandoning it");
                Some(-1)
            }
        }
    }

    /// Wait for the exit of a process being stopped, passing on whatever it
    /// prints on the way out. That output no longer drives the state.
    async fn wait_for_exit(&mut self, events: &mut mpsc::Receiver<ProcessEvent>) -> i32 {
        while let Some(event) = events.recv().await {
            match event {
                ProcessEvent::Output { stream, data } => self.emit_output(stream, data).await,
                ProcessEvent::Exited(code) => return code,
            }
        }
        -1
    }

    async fn shutdown(&mut self) {
        info!(command = %self.spec.name, "shutting down");
        self.watch = None;
        if let Some(code) = self.terminate().await {
            debug!(command = %self.spec.name, exit_code = code, "process stopped");
        }
    }

    async fn set_state(&mut self, state: State) {
        if self.state == state {
            return;
        }
        debug!(command = %self.spec.name, from = %self.state, to = %state, "state change");
        self.state = state;
        let name = self.spec.name.clone();
        self.emit(SupervisorEvent::State { name, state }).await;
    }

    async fn emit_output(&mut self, stream: OutputStream, data: String) {
        let name = self.spec.name.clone();
        self.emit(SupervisorEvent::Output { name, stream, data }).await;
    }

    async fn emit(&mut self, event: SupervisorEvent) {
        if self.events.send(event).await.is_err() {
            debug!(command = %self.spec.name, "event receiver dropped");
        }
    }
}

/// Next change event, or never if nothing is being watched.
async fn next_change(watch: &mut Option<WatchSubscription>) -> ChangeEvent {
    loop {
        let Some(subscription) = watch.as_mut() else {
            return std::future::pending().await;
        };
        if let Some(change) = subscription.recv().await {
            return change;
        }
        // Watcher went away; stop polling it.
        *watch = None;
    }
}

/// Next event from the live process, or never if none is running.
///
/// A channel that closes without an exit is reported as exit code -1.
async fn next_process_event(process: &mut Option<SpawnedProcess>) -> ProcessEvent {
    match process.as_mut() {
        Some(p) => p.events.recv().await.unwrap_or(ProcessEvent::Exited(-1)),
        None => std::future::pending().await,
    }
}
