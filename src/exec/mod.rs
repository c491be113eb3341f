// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the configured commands,
//! using `tokio::process::Command`, and reporting their output and exit back
//! to the owning supervisor as `ProcessEvent`s.
//!
//! - [`backend`] provides the `ProcessBackend` trait and the concrete
//!   `RealProcessBackend`, which tests can replace with a fake.
//! - [`task_runner`] spawns one process and pumps its pipes.
//! - [`lines`] buffers partial lines across pipe reads.
//! - [`kill`] terminates a whole process tree.

pub mod backend;
pub mod kill;
pub mod lines;
pub mod task_runner;

pub use backend::{ProcessBackend, ProcessEvent, RealProcessBackend, SpawnedProcess, TreeKiller};
pub use kill::OsTreeKiller;
pub use lines::{LineBuffer, MAX_PENDING_LINE};
pub use task_runner::PIPE_DRAIN_TIMEOUT;
