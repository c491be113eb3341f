use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use tend::command::CommandSpec;
use tend::errors::{Result, TendError};
use tend::exec::{ProcessBackend, ProcessEvent, SpawnedProcess, TreeKiller};
use tend::types::OutputStream;

/// What a fake process does after it is spawned.
///
/// A script without `exit` leaves the process running until it is killed or
/// told to exit through a [`ProcessController`].
#[derive(Debug, Clone, Default)]
pub struct Script {
    steps: Vec<Step>,
}

#[derive(Debug, Clone)]
enum Step {
    Output(OutputStream, String),
    Sleep(Duration),
    Exit(i32),
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs until killed, printing nothing.
    pub fn running() -> Self {
        Self::default()
    }

    pub fn stdout(mut self, data: &str) -> Self {
        self.steps.push(Step::Output(OutputStream::Stdout, data.to_string()));
        self
    }

    pub fn stderr(mut self, data: &str) -> Self {
        self.steps.push(Step::Output(OutputStream::Stderr, data.to_string()));
        self
    }

    pub fn sleep(mut self, d: Duration) -> Self {
        self.steps.push(Step::Sleep(d));
        self
    }

    pub fn exit(mut self, code: i32) -> Self {
        self.steps.push(Step::Exit(code));
        self
    }
}

/// One call to `spawn`.
#[derive(Debug, Clone)]
pub struct SpawnRecord {
    pub name: String,
    pub command_line: String,
    pub at: Instant,
}

/// One call to `kill_tree`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillRecord {
    pub name: String,
    pub force: bool,
}

#[derive(Default)]
struct Inner {
    scripts: HashMap<String, VecDeque<Script>>,
    ignore_term: Vec<String>,
    fail_spawn: Vec<String>,
    spawns: Vec<SpawnRecord>,
    kills: Vec<KillRecord>,
    live: usize,
    max_live: usize,
    processes: HashMap<String, Arc<FakeProcess>>,
}

/// Scripted `ProcessBackend` that never touches the OS.
///
/// Each spawn of a command consumes the next script queued for its name; once
/// the queue is empty the process just keeps running.
#[derive(Clone, Default)]
pub struct FakeBackend {
    inner: Arc<Mutex<Inner>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `script` for the next spawn of `name`.
    pub fn script(&self, name: &str, script: Script) -> &Self {
        let mut inner = self.inner.lock().unwrap();
        inner
            .scripts
            .entry(name.to_string())
            .or_default()
            .push_back(script);
        self
    }

    /// Processes named `name` survive a polite termination request.
    pub fn ignore_term(&self, name: &str) -> &Self {
        self.inner.lock().unwrap().ignore_term.push(name.to_string());
        self
    }

    /// Spawning `name` fails.
    pub fn fail_spawn(&self, name: &str) -> &Self {
        self.inner.lock().unwrap().fail_spawn.push(name.to_string());
        self
    }

    pub fn spawns(&self) -> Vec<SpawnRecord> {
        self.inner.lock().unwrap().spawns.clone()
    }

    pub fn spawned_names(&self) -> Vec<String> {
        self.spawns().into_iter().map(|s| s.name).collect()
    }

    pub fn spawn_count(&self, name: &str) -> usize {
        self.spawns().iter().filter(|s| s.name == name).count()
    }

    pub fn kills(&self) -> Vec<KillRecord> {
        self.inner.lock().unwrap().kills.clone()
    }

    /// Processes spawned and not yet exited.
    pub fn live(&self) -> usize {
        self.inner.lock().unwrap().live
    }

    /// Highest number of processes ever alive at once.
    pub fn max_live(&self) -> usize {
        self.inner.lock().unwrap().max_live
    }

    /// Controller for the most recent process spawned as `name`.
    pub fn process(&self, name: &str) -> Option<ProcessController> {
        let inner = self.inner.lock().unwrap();
        inner.processes.get(name).map(|p| ProcessController {
            process: Arc::clone(p),
        })
    }
}

impl ProcessBackend for FakeBackend {
    fn spawn(&self, spec: &CommandSpec) -> Result<SpawnedProcess> {
        let (tx, rx) = mpsc::channel(256);
        let (script, ignore_term, process) = {
            let mut inner = self.inner.lock().unwrap();
            if inner.fail_spawn.contains(&spec.name) {
                return Err(TendError::Other(anyhow::anyhow!(
                    "no such program: {}",
                    spec.command
                )));
            }

            inner.spawns.push(SpawnRecord {
                name: spec.name.clone(),
                command_line: spec.command_line(),
                at: Instant::now(),
            });
            inner.live += 1;
            inner.max_live = inner.max_live.max(inner.live);

            let script = inner
                .scripts
                .get_mut(&spec.name)
                .and_then(VecDeque::pop_front)
                .unwrap_or_default();
            let ignore_term = inner.ignore_term.contains(&spec.name);
            let process = Arc::new(FakeProcess {
                name: spec.name.clone(),
                backend: Arc::clone(&self.inner),
                tx: Mutex::new(Some(tx)),
            });
            inner
                .processes
                .insert(spec.name.clone(), Arc::clone(&process));
            (script, ignore_term, process)
        };

        let runner = Arc::clone(&process);
        tokio::spawn(async move {
            for step in script.steps {
                match step {
                    Step::Output(stream, data) => runner.output(stream, data),
                    Step::Sleep(d) => tokio::time::sleep(d).await,
                    Step::Exit(code) => {
                        runner.exit(code);
                        return;
                    }
                }
            }
        });

        Ok(SpawnedProcess {
            pid: None,
            events: rx,
            killer: Box::new(FakeKiller {
                process,
                ignore_term,
            }),
        })
    }
}

struct FakeProcess {
    name: String,
    backend: Arc<Mutex<Inner>>,
    /// `None` once the process has exited.
    tx: Mutex<Option<mpsc::Sender<ProcessEvent>>>,
}

impl FakeProcess {
    fn output(&self, stream: OutputStream, data: String) {
        if let Some(tx) = self.tx.lock().unwrap().as_ref() {
            let _ = tx.try_send(ProcessEvent::Output { stream, data });
        }
    }

    /// First call wins; later exits of the same process are ignored.
    fn exit(&self, code: i32) {
        let Some(tx) = self.tx.lock().unwrap().take() else {
            return;
        };
        self.backend.lock().unwrap().live -= 1;
        let _ = tx.try_send(ProcessEvent::Exited(code));
    }

    fn has_exited(&self) -> bool {
        self.tx.lock().unwrap().is_none()
    }
}

struct FakeKiller {
    process: Arc<FakeProcess>,
    ignore_term: bool,
}

impl TreeKiller for FakeKiller {
    fn kill_tree(&mut self, force: bool) -> Result<()> {
        self.process.backend.lock().unwrap().kills.push(KillRecord {
            name: self.process.name.clone(),
            force,
        });
        if force || !self.ignore_term {
            self.process.exit(-1);
        }
        Ok(())
    }
}

/// Drives a running fake process from a test.
#[derive(Clone)]
pub struct ProcessController {
    process: Arc<FakeProcess>,
}

impl ProcessController {
    pub fn stdout(&self, data: &str) {
        self.process.output(OutputStream::Stdout, data.to_string());
    }

    pub fn stderr(&self, data: &str) {
        self.process.output(OutputStream::Stderr, data.to_string());
    }

    pub fn exit(&self, code: i32) {
        self.process.exit(code);
    }

    pub fn has_exited(&self) -> bool {
        self.process.has_exited()
    }
}
