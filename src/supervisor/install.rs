// src/supervisor/install.rs

//! Install chain: setup commands run one at a time before the first start.

use std::collections::VecDeque;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::command::CommandSpec;
use crate::supervisor::events::{Control, SupervisorEvent};
use crate::supervisor::{Supervisor, SupervisorContext};
use crate::types::State;

const STEP_EVENT_CHANNEL_CAPACITY: usize = 64;

/// How an install chain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChainOutcome {
    /// Every step exited with code 0.
    Completed,
    /// A step exited with this non-zero code; later steps never ran.
    Failed(i32),
    /// Shutdown was requested while a step was running.
    Cancelled,
}

/// FIFO queue of install steps for one parent command.
///
/// Each step runs under its own install-step [`Supervisor`], so its output is
/// classified and displayed like any command's. Only one step is alive at a
/// time and the parent's own process is not spawned until the queue is empty.
#[derive(Debug)]
pub(crate) struct InstallChain {
    queue: VecDeque<CommandSpec>,
    ctx: SupervisorContext,
}

impl InstallChain {
    /// Queue `parent`'s install steps, naming each `<parent>:<step>`.
    pub(crate) fn new(parent: &CommandSpec, ctx: SupervisorContext) -> Self {
        let queue = parent
            .install
            .iter()
            .cloned()
            .map(|mut step| {
                step.name = format!("{}:{}", parent.name, step.name);
                step
            })
            .collect();
        Self { queue, ctx }
    }

    /// Run the steps in order.
    ///
    /// Step events other than the final close are forwarded to `events`.
    /// `control` is the parent's control channel; a shutdown request stops
    /// the running step.
    pub(crate) async fn run(
        mut self,
        events: &mpsc::Sender<SupervisorEvent>,
        control: &mut mpsc::Receiver<Control>,
    ) -> ChainOutcome {
        while let Some(step) = self.queue.pop_front() {
            let name = step.name.clone();
            info!(step = %name, remaining = self.queue.len(), "running install step");

            match self.run_step(step, events, control).await {
                ChainOutcome::Completed => continue,
                ChainOutcome::Failed(code) => {
                    debug!(step = %name, exit_code = code, skipped = self.queue.len(), "aborting install chain");
                    return ChainOutcome::Failed(code);
                }
                ChainOutcome::Cancelled => return ChainOutcome::Cancelled,
            }
        }
        ChainOutcome::Completed
    }

    async fn run_step(
        &self,
        step: CommandSpec,
        events: &mpsc::Sender<SupervisorEvent>,
        control: &mut mpsc::Receiver<Control>,
    ) -> ChainOutcome {
        let (step_tx, mut step_rx) = mpsc::channel(STEP_EVENT_CHANNEL_CAPACITY);
        let mut supervisor = Supervisor::install_step(step, self.ctx.clone());
        let handle = match supervisor.start(step_tx) {
            Ok(handle) => handle,
            Err(e) => {
                error!(step = %supervisor.name(), error = %e, "could not start install step");
                return ChainOutcome::Failed(-1);
            }
        };

        loop {
            tokio::select! {
                event = step_rx.recv() => match event {
                    Some(SupervisorEvent::Closed { code, .. }) => {
                        handle.join().await;
                        return ChainOutcome::Failed(code);
                    }
                    Some(event) => {
                        let complete = matches!(
                            event,
                            SupervisorEvent::State { state: State::Complete, .. }
                        );
                        if events.send(event).await.is_err() {
                            debug!(step = %handle.name(), "event receiver dropped");
                        }
                        if complete {
                            handle.join().await;
                            return ChainOutcome::Completed;
                        }
                    }
                    None => {
                        handle.join().await;
                        return ChainOutcome::Failed(-1);
                    }
                },
                request = control.recv() => match request {
                    Some(Control::Respawn) => {
                        debug!(step = %handle.name(), "ignoring respawn request during install");
                    }
                    Some(Control::Shutdown) | None => {
                        handle.shutdown().await;
                        return ChainOutcome::Cancelled;
                    }
                },
            }
        }
    }
}
