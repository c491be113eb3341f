// tests/install_chain.rs

mod common;

use std::time::Duration;

use tokio::sync::mpsc;

use common::{init_tracing, recv_until, states};
use tend::supervisor::{Supervisor, SupervisorEvent};
use tend_test_utils::builders::CommandSpecBuilder;
use tend_test_utils::{FakeBackend, FakeWatcher, Script, fake_context, wait_until};

fn web_with_steps(steps: &[&str]) -> tend::command::CommandSpec {
    steps
        .iter()
        .fold(CommandSpecBuilder::new("web"), |b, step| {
            b.install(CommandSpecBuilder::new(step).build())
        })
        .build()
}

fn s(name: &str, state: &str) -> (String, String) {
    (name.to_string(), state.to_string())
}

#[tokio::test(start_paused = true)]
async fn steps_run_one_at_a_time_before_the_command() {
    init_tracing();
    let backend = FakeBackend::new();
    let step = Script::new().sleep(Duration::from_millis(100)).exit(0);
    backend.script("web:deps", step.clone());
    backend.script("web:codegen", step);
    let watcher = FakeWatcher::new();
    let mut sup = Supervisor::new(
        web_with_steps(&["deps", "codegen"]),
        fake_context(&backend, &watcher),
    );

    let (tx, mut rx) = mpsc::channel(64);
    let handle = sup.start(tx).unwrap();

    let events = recv_until(&mut rx, |e| {
        matches!(e, SupervisorEvent::State { name, .. } if name == "web")
    })
    .await;

    assert_eq!(
        states(&events),
        vec![
            s("web:deps", "complete"),
            s("web:codegen", "complete"),
            s("web", "initializing"),
        ]
    );
    assert_eq!(backend.spawned_names(), vec!["web:deps", "web:codegen", "web"]);
    assert_eq!(backend.max_live(), 1);

    let spawns = backend.spawns();
    assert!(spawns[1].at - spawns[0].at >= Duration::from_millis(100));
    assert!(spawns[2].at - spawns[1].at >= Duration::from_millis(100));

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failing_step_aborts_chain_without_restart() {
    init_tracing();
    let backend = FakeBackend::new();
    backend.script("web:deps", Script::new().stderr("npm ERR! missing").exit(2));
    backend.script("web:codegen", Script::new().exit(0));
    let watcher = FakeWatcher::new();
    let mut sup = Supervisor::new(
        web_with_steps(&["deps", "codegen"]),
        fake_context(&backend, &watcher),
    );

    let (tx, mut rx) = mpsc::channel(64);
    let handle = sup.start(tx).unwrap();

    let events = recv_until(&mut rx, |e| {
        matches!(e, SupervisorEvent::Closed { name, .. } if name == "web")
    })
    .await;

    match events.last() {
        Some(SupervisorEvent::Closed { code, restart, .. }) => {
            assert_eq!(*code, 2);
            assert!(restart.is_none(), "install failures are not restarted");
        }
        other => panic!("expected Closed, got {other:?}"),
    }
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, SupervisorEvent::Closed { name, .. } if name == "web:deps")),
        "the step's own close stays inside the chain"
    );
    assert_eq!(
        states(&events),
        vec![s("web:deps", "closed"), s("web", "closed")]
    );

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(backend.spawned_names(), vec!["web:deps"]);
    assert!(!handle.is_finished(), "supervisor idles until shutdown");

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unnamed_step_is_shown_as_parent_install() {
    let backend = FakeBackend::new();
    backend.script("api:install", Script::new().exit(0));
    let watcher = FakeWatcher::new();
    let spec = CommandSpecBuilder::new("api")
        .install(CommandSpecBuilder::new(tend::supervisor::DEFAULT_STEP_NAME).build())
        .build();
    let mut sup = Supervisor::new(spec, fake_context(&backend, &watcher));

    let (tx, _rx) = mpsc::channel(64);
    let handle = sup.start(tx).unwrap();

    wait_until(|| backend.spawn_count("api") == 1).await;
    assert_eq!(backend.spawned_names(), vec!["api:install", "api"]);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_during_install_stops_the_step() {
    let backend = FakeBackend::new();
    let watcher = FakeWatcher::new();
    let mut sup = Supervisor::new(web_with_steps(&["deps"]), fake_context(&backend, &watcher));

    let (tx, _rx) = mpsc::channel(64);
    let handle = sup.start(tx).unwrap();
    wait_until(|| backend.spawn_count("web:deps") == 1).await;

    handle.shutdown().await;

    assert_eq!(backend.live(), 0);
    assert_eq!(backend.kills().len(), 1);
    assert_eq!(backend.kills()[0].name, "web:deps");
    assert_eq!(backend.spawn_count("web"), 0);
}
