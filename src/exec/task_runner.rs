// src/exec/task_runner.rs

//! Spawning a single command and pumping its pipes into `ProcessEvent`s.

use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::command::CommandSpec;
use crate::errors::Result;
use crate::exec::backend::{ProcessEvent, SpawnedProcess};
use crate::exec::kill::OsTreeKiller;
use crate::exec::lines::LineBuffer;
use crate::types::OutputStream;

const EVENT_CHANNEL_CAPACITY: usize = 256;
const READ_BUF_SIZE: usize = 8 * 1024;

/// How long the pipes may keep draining once the process itself has exited.
/// Anything still holding them open after that (a backgrounded child) no
/// longer delays the exit report.
pub const PIPE_DRAIN_TIMEOUT: Duration = Duration::from_millis(250);

/// Spawn `spec` and return its event stream plus a tree killer.
///
/// Three background tasks are started: one per pipe, and one that waits for
/// the exit and sends `Exited` once the pipes are drained, or after
/// [`PIPE_DRAIN_TIMEOUT`] if a surviving child keeps them open.
pub fn spawn_process(spec: &CommandSpec) -> Result<SpawnedProcess> {
    info!(
        command = %spec.name,
        cmd = %spec.command_line(),
        "starting process"
    );

    let mut cmd = build_command(spec);
    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for command '{}'", spec.name))?;

    let pid = child.id();
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

    let stdout_pump = child
        .stdout
        .take()
        .map(|out| tokio::spawn(pump(out, OutputStream::Stdout, tx.clone())));
    let stderr_pump = child
        .stderr
        .take()
        .map(|err| tokio::spawn(pump(err, OutputStream::Stderr, tx.clone())));

    let name = spec.name.clone();
    tokio::spawn(async move {
        let code = match child.wait().await {
            Ok(status) => status.code().unwrap_or(-1),
            Err(e) => {
                warn!(command = %name, error = %e, "failed to wait for process");
                -1
            }
        };

        let deadline = tokio::time::Instant::now() + PIPE_DRAIN_TIMEOUT;
        for mut pump in [stdout_pump, stderr_pump].into_iter().flatten() {
            if tokio::time::timeout_at(deadline, &mut pump).await.is_err() {
                debug!(command = %name, "pipe still held open after exit; no longer reading it");
                pump.abort();
            }
        }

        info!(command = %name, exit_code = code, "process exited");
        let _ = tx.send(ProcessEvent::Exited(code)).await;
    });

    Ok(SpawnedProcess {
        pid,
        events: rx,
        killer: Box::new(OsTreeKiller::new(pid)),
    })
}

fn build_command(spec: &CommandSpec) -> Command {
    let mut cmd = if spec.options.shell {
        let line = spec.command_line();
        if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(line);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(line);
            c
        }
    } else {
        let mut c = Command::new(&spec.command);
        c.args(&spec.args);
        c
    };

    if let Some(cwd) = &spec.options.cwd {
        cmd.current_dir(cwd);
    }
    cmd.envs(&spec.options.env);

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // Own process group, so the whole tree can be signalled with killpg.
    #[cfg(unix)]
    cmd.process_group(0);

    cmd
}

async fn pump<R>(mut reader: R, stream: OutputStream, tx: mpsc::Sender<ProcessEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUF_SIZE];
    let mut lines = LineBuffer::new();

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!(?stream, error = %e, "pipe read failed");
                break;
            }
        };
        if let Some(data) = lines.push(&buf[..n]) {
            if tx.send(ProcessEvent::Output { stream, data }).await.is_err() {
                return;
            }
        }
    }

    if let Some(data) = lines.finish() {
        let _ = tx.send(ProcessEvent::Output { stream, data }).await;
    }
}
