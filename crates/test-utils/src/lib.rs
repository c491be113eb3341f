pub mod builders;
pub mod fake_backend;
pub mod fake_watcher;

use std::io::{self, Write};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use tend::supervisor::SupervisorContext;
use tracing_subscriber::{fmt, EnvFilter};

pub use fake_backend::{FakeBackend, KillRecord, ProcessController, Script, SpawnRecord};
pub use fake_watcher::FakeWatcher;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// A context wired to the given fakes, with production timings.
pub fn fake_context(backend: &FakeBackend, watcher: &FakeWatcher) -> SupervisorContext {
    SupervisorContext::new(Arc::new(backend.clone()), Arc::new(watcher.clone()))
}

/// Run a future with a 10-second timeout.
///
/// Under `start_paused` the timeout is virtual time, so it only fires if the
/// test is truly stuck.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(10), f)
        .await
        .expect("Test timed out after 10 seconds")
}

/// Poll `cond` every 10ms until it holds.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    with_timeout(async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
}

/// Clonable in-memory writer; every clone appends to the same bytes.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
