// src/manager/mod.rs

//! The manager: starts one supervisor per included command, fans their
//! events into a single stream and renders it.
//!
//! The split mirrors the rest of the crate:
//! - [`filter`] decides which commands run,
//! - [`view`] turns events into terminal output,
//! - [`SupervisorManager`] is the async shell that owns the event channel
//!   and decides about restarts.

pub mod filter;
pub mod view;

use std::future::Future;
use std::io::Write;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::command::CommandSpec;
use crate::errors::Result;
use crate::supervisor::{Supervisor, SupervisorContext, SupervisorEvent};

pub use filter::{IncludeFilter, merge_filters};
pub use view::{StatusView, current_user, status_token};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Owns the supervisors of one run and the display they feed.
pub struct SupervisorManager<W: Write> {
    supervisors: Vec<Supervisor>,
    view: StatusView<W>,
}

impl<W: Write> SupervisorManager<W> {
    /// Build supervisors for every command `filters` lets through.
    ///
    /// Commands are kept in configuration order; that is also the order of
    /// the status line.
    pub fn new(
        commands: Vec<CommandSpec>,
        filters: &[String],
        ctx: SupervisorContext,
        mut view: StatusView<W>,
    ) -> Result<Self> {
        let filter = IncludeFilter::new(filters)?;
        let total = commands.len();

        let supervisors: Vec<Supervisor> = commands
            .into_iter()
            .filter(|spec| filter.matches(spec))
            .map(|spec| Supervisor::new(spec, ctx.clone()))
            .collect();

        for sup in &supervisors {
            view.track(sup.name(), sup.initial_state());
        }

        if supervisors.is_empty() {
            warn!(?filters, total, "include filter matched no commands");
        } else {
            debug!(included = supervisors.len(), total, "commands selected");
        }

        Ok(Self { supervisors, view })
    }

    /// Names of the supervised commands, in display order.
    pub fn names(&self) -> Vec<&str> {
        self.supervisors.iter().map(|s| s.name()).collect()
    }

    /// Start every supervisor and render their events until `shutdown`
    /// resolves or every supervisor has stopped.
    ///
    /// Every process tree is killed and awaited before this returns, also
    /// when rendering fails; the rendering error is returned afterwards.
    pub async fn run<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let mut handles = Vec::with_capacity(self.supervisors.len());
        let mut outcome = Ok(());
        for sup in &mut self.supervisors {
            match sup.start(tx.clone()) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }
        // Only supervisors hold senders now; `recv` yields `None` once all
        // of them are gone.
        drop(tx);

        if outcome.is_ok() {
            outcome = self.render_until(&mut rx, shutdown).await;
        }
        if let Err(e) = &outcome {
            error!(error = %e, "manager stopped on error; shutting supervisors down");
        }

        // Supervisors block on a full channel; dropping the receiver lets
        // their sends fail so they can see the shutdown request.
        drop(rx);

        let mut stopping = JoinSet::new();
        for handle in handles {
            stopping.spawn(handle.shutdown());
        }
        while let Some(res) = stopping.join_next().await {
            if let Err(e) = res {
                warn!(error = %e, "supervisor shutdown task failed");
            }
        }

        let finished = self.view.finish();
        outcome?;
        finished?;
        Ok(())
    }

    async fn render_until<F>(
        &mut self,
        rx: &mut mpsc::Receiver<SupervisorEvent>,
        shutdown: F,
    ) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.view.render_summary()?;

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => self.handle_event(event)?,
                    None => {
                        info!("all supervisors stopped");
                        return Ok(());
                    }
                },
                () = &mut shutdown => {
                    info!("shutdown requested");
                    return Ok(());
                }
            }
        }
    }

    fn handle_event(&mut self, event: SupervisorEvent) -> Result<()> {
        match event {
            SupervisorEvent::State { name, state } => {
                self.view.on_state(&name, state)?;
            }
            SupervisorEvent::Output { name, stream, data } => {
                self.view.on_output(&name, stream, &data)?;
            }
            SupervisorEvent::Closed {
                name,
                code,
                restart,
            } => {
                self.view.on_close(&name, code, restart.is_some())?;
                if let Some(restart) = restart {
                    debug!(command = %name, delay = ?restart.delay(), "scheduling restart");
                    restart.restart();
                }
            }
        }
        Ok(())
    }
}
