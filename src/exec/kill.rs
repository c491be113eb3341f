// src/exec/kill.rs

//! Process-tree termination.
//!
//! Signalling only the direct child leaves grandchildren (e.g. the server a
//! `npm run dev` wrapper starts) orphaned and holding ports. On Unix every
//! child is spawned as the leader of its own process group, so the whole
//! group is signalled at once. On Windows `taskkill /T` walks the tree.

use tracing::debug;

use crate::errors::Result;
use crate::exec::backend::TreeKiller;

/// [`TreeKiller`] for processes spawned by [`super::task_runner`].
#[derive(Debug, Clone, Copy)]
pub struct OsTreeKiller {
    pid: Option<u32>,
}

impl OsTreeKiller {
    pub fn new(pid: Option<u32>) -> Self {
        Self { pid }
    }
}

impl TreeKiller for OsTreeKiller {
    fn kill_tree(&mut self, force: bool) -> Result<()> {
        let Some(pid) = self.pid else {
            debug!("process already reaped; nothing to kill");
            return Ok(());
        };
        kill_tree_impl(pid, force)
    }
}

#[cfg(unix)]
fn kill_tree_impl(pid: u32, force: bool) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let signal = if force { Signal::SIGKILL } else { Signal::SIGTERM };
    debug!(pid, ?signal, "signalling process group");

    match killpg(Pid::from_raw(pid as i32), signal) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(std::io::Error::from(e).into()),
    }
}

#[cfg(windows)]
fn kill_tree_impl(pid: u32, force: bool) -> Result<()> {
    let mut cmd = tokio::process::Command::new("taskkill");
    cmd.arg("/T").arg("/PID").arg(pid.to_string());
    if force {
        cmd.arg("/F");
    }
    debug!(pid, force, "running taskkill");
    cmd.stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()?;
    Ok(())
}
