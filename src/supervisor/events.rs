// src/supervisor/events.rs

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::types::{OutputStream, State};

/// Events a supervisor reports to whoever started it.
///
/// Each supervisor is the only sender of its own events, so they arrive in
/// the order they happened; events from different supervisors interleave
/// arbitrarily.
#[derive(Debug)]
pub enum SupervisorEvent {
    /// The state changed.
    State { name: String, state: State },
    /// One chunk of complete output lines.
    Output {
        name: String,
        stream: OutputStream,
        data: String,
    },
    /// The process exited unexpectedly (or an install step failed).
    ///
    /// `restart` is present for ordinary crashes. It is `None` when an install
    /// step failed: rerunning an unchanged failing install would fail again.
    Closed {
        name: String,
        code: i32,
        restart: Option<RestartHandle>,
    },
}

impl SupervisorEvent {
    pub fn name(&self) -> &str {
        match self {
            SupervisorEvent::State { name, .. }
            | SupervisorEvent::Output { name, .. }
            | SupervisorEvent::Closed { name, .. } => name,
        }
    }
}

/// Requests sent into a running supervisor task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    /// Spawn the command again if nothing is running.
    Respawn,
    /// Kill the process tree and stop.
    Shutdown,
}

/// Capability to respawn a command after it closed.
///
/// The supervisor never restarts itself after a crash; it hands one of these
/// to the receiver of [`SupervisorEvent::Closed`], which decides.
pub struct RestartHandle {
    control: mpsc::Sender<Control>,
    delay: Duration,
}

impl fmt::Debug for RestartHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestartHandle")
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

impl RestartHandle {
    pub(crate) fn new(control: mpsc::Sender<Control>, delay: Duration) -> Self {
        Self { control, delay }
    }

    /// Delay applied before the respawn.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Respawn the command after the fixed delay.
    ///
    /// Returns immediately; the wait happens on a background task.
    pub fn restart(self) {
        tokio::spawn(async move {
            tokio::time::sleep(self.delay).await;
            if self.control.send(Control::Respawn).await.is_err() {
                debug!("supervisor gone before restart delay elapsed");
            }
        });
    }
}
