use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use tend::command::WatchSpec;
use tend::errors::Result;
use tend::watch::{ChangeEvent, ChangeWatcher, WatchSubscription};

/// `ChangeWatcher` whose changes are triggered by hand.
#[derive(Clone, Default)]
pub struct FakeWatcher {
    subscribers: Arc<Mutex<HashMap<String, mpsc::UnboundedSender<ChangeEvent>>>>,
}

impl FakeWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_subscribed(&self, name: &str) -> bool {
        self.subscribers
            .lock()
            .unwrap()
            .get(name)
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Report a change to `path` to the command `name`.
    ///
    /// Returns false if nobody is listening.
    pub fn trigger(&self, name: &str, path: impl Into<PathBuf>) -> bool {
        let subs = self.subscribers.lock().unwrap();
        match subs.get(name) {
            Some(tx) => tx.send(ChangeEvent { path: path.into() }).is_ok(),
            None => false,
        }
    }
}

impl ChangeWatcher for FakeWatcher {
    fn subscribe(&self, name: &str, _spec: &WatchSpec) -> Result<WatchSubscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().insert(name.to_string(), tx);
        Ok(WatchSubscription::from_channel(rx))
    }
}
