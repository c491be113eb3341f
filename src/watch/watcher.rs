// src/watch/watcher.rs

use std::path::PathBuf;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::command::WatchSpec;
use crate::errors::Result;
use crate::watch::patterns::WatchProfile;

/// A watched path changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
}

/// Stream of change events for one supervisor.
///
/// Dropping the subscription stops watching.
pub struct WatchSubscription {
    events: mpsc::UnboundedReceiver<ChangeEvent>,
    _guard: Option<Box<dyn Send>>,
}

impl std::fmt::Debug for WatchSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSubscription").finish_non_exhaustive()
    }
}

impl WatchSubscription {
    /// Wrap a channel, keeping `guard` (typically the OS watcher) alive for as
    /// long as the subscription exists.
    pub fn new(events: mpsc::UnboundedReceiver<ChangeEvent>, guard: impl Send + 'static) -> Self {
        Self {
            events,
            _guard: Some(Box::new(guard)),
        }
    }

    /// Subscription backed by nothing but a channel (used by fakes).
    pub fn from_channel(events: mpsc::UnboundedReceiver<ChangeEvent>) -> Self {
        Self {
            events,
            _guard: None,
        }
    }

    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    /// Discard events that are already queued; returns how many were dropped.
    ///
    /// One save in an editor often produces a burst of notifications; they
    /// all collapse into a single restart.
    pub fn drain_pending(&mut self) -> usize {
        let mut dropped = 0;
        while self.events.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}

/// Capability for subscribing to filesystem changes.
pub trait ChangeWatcher: Send + Sync {
    /// Start watching `spec` on behalf of the command called `name`.
    fn subscribe(&self, name: &str, spec: &WatchSpec) -> Result<WatchSubscription>;
}

/// Production watcher built on `notify`.
///
/// `notify` reports changes only, never the files that already exist when
/// watching starts, so no startup burst of events reaches the supervisor.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyWatcher;

impl NotifyWatcher {
    pub fn new() -> Self {
        Self
    }
}

impl ChangeWatcher for NotifyWatcher {
    fn subscribe(&self, name: &str, spec: &WatchSpec) -> Result<WatchSubscription> {
        let profile = WatchProfile::from_spec(spec)?;
        let roots: Vec<PathBuf> = profile.targets().iter().map(|t| t.root().to_path_buf()).collect();

        // Channel from the blocking notify callback into the async world.
        let (event_tx, event_rx) = mpsc::unbounded_channel::<ChangeEvent>();

        let command = name.to_string();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Access(_)) {
                        return;
                    }
                    for path in event.paths {
                        if profile.matches(&path) {
                            // Receiver gone means the supervisor stopped; nothing to do.
                            let _ = event_tx.send(ChangeEvent { path });
                        }
                    }
                }
                Err(err) => {
                    // We can't return errors from here, so log and carry on.
                    warn!(command = %command, error = %err, "file watch error");
                }
            },
            Config::default(),
        )?;

        for root in &roots {
            if !root.exists() {
                warn!(command = %name, path = ?root, "watch path does not exist; skipping");
                continue;
            }
            let mode = if root.is_dir() {
                RecursiveMode::Recursive
            } else {
                RecursiveMode::NonRecursive
            };
            watcher.watch(root, mode)?;
            debug!(command = %name, path = ?root, "watching");
        }

        info!(command = %name, paths = ?spec.paths, "file watcher started");
        Ok(WatchSubscription::new(event_rx, watcher))
    }
}
