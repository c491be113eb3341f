// src/exec/backend.rs

//! Pluggable process backend abstraction.
//!
//! Supervisors talk to a `ProcessBackend` instead of spawning OS processes
//! directly. This makes it easy to swap in a fake backend in tests while
//! keeping the production implementation in [`task_runner`].
//!
//! - `RealProcessBackend` is the default implementation used by `tend`. It
//!   spawns the command with `tokio::process` in its own process group.
//! - Tests can provide their own `ProcessBackend` that, for example, records
//!   which commands were spawned and emits scripted output and exits.
//!
//! [`task_runner`]: super::task_runner

use tokio::sync::mpsc;

use crate::command::CommandSpec;
use crate::errors::Result;
use crate::types::OutputStream;

/// Something that happened to a running process.
///
/// A backend delivers any number of `Output` events followed by exactly one
/// `Exited`. Output produced before the exit is always delivered first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// One or more complete lines, joined with `\n`.
    Output { stream: OutputStream, data: String },
    /// Exit code; `-1` when the process was killed by a signal.
    Exited(i32),
}

/// Terminates a process together with every descendant it started.
pub trait TreeKiller: Send {
    /// Ask the whole tree to stop. With `force`, kill it outright.
    ///
    /// The matching `ProcessEvent::Exited` is still delivered through the
    /// process's event channel.
    fn kill_tree(&mut self, force: bool) -> Result<()>;
}

/// Handle to a freshly spawned process.
pub struct SpawnedProcess {
    pub pid: Option<u32>,
    pub events: mpsc::Receiver<ProcessEvent>,
    pub killer: Box<dyn TreeKiller>,
}

impl std::fmt::Debug for SpawnedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnedProcess")
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

/// Trait abstracting how commands are turned into running processes.
///
/// Production code uses [`RealProcessBackend`]; tests can provide their own
/// implementation that doesn't spawn real processes.
pub trait ProcessBackend: Send + Sync {
    /// Start `spec.command` with its args and options.
    fn spawn(&self, spec: &CommandSpec) -> Result<SpawnedProcess>;
}

/// Real process backend used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealProcessBackend;

impl RealProcessBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessBackend for RealProcessBackend {
    fn spawn(&self, spec: &CommandSpec) -> Result<SpawnedProcess> {
        super::task_runner::spawn_process(spec)
    }
}
