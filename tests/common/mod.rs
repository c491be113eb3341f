#![allow(dead_code)]

use std::sync::OnceLock;

use regex::Regex;
use tokio::sync::mpsc;

use tend::supervisor::SupervisorEvent;
use tend_test_utils::with_timeout;

pub use tend_test_utils::init_tracing;

/// Remove ANSI color sequences so assertions don't depend on TTY detection.
pub fn strip_ansi(s: &str) -> String {
    static ANSI: OnceLock<Regex> = OnceLock::new();
    let re = ANSI.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap());
    re.replace_all(s, "").into_owned()
}

/// Receive events until `pred` matches one; returns everything received,
/// including the match.
pub async fn recv_until(
    rx: &mut mpsc::Receiver<SupervisorEvent>,
    mut pred: impl FnMut(&SupervisorEvent) -> bool,
) -> Vec<SupervisorEvent> {
    with_timeout(async {
        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            let done = pred(&event);
            seen.push(event);
            if done {
                return seen;
            }
        }
        panic!("event channel closed early; got {seen:?}");
    })
    .await
}

/// Everything already queued, without waiting.
pub fn drain(rx: &mut mpsc::Receiver<SupervisorEvent>) -> Vec<SupervisorEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = rx.try_recv() {
        seen.push(event);
    }
    seen
}

/// `(name, state)` pairs of the state events in `events`.
pub fn states(events: &[SupervisorEvent]) -> Vec<(String, String)> {
    events
        .iter()
        .filter_map(|e| match e {
            SupervisorEvent::State { name, state } => Some((name.clone(), state.to_string())),
            _ => None,
        })
        .collect()
}

pub fn outputs(events: &[SupervisorEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            SupervisorEvent::Output { data, .. } => Some(data.clone()),
            _ => None,
        })
        .collect()
}
