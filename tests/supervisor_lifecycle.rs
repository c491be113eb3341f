// tests/supervisor_lifecycle.rs

mod common;

use std::time::Duration;

use tokio::sync::mpsc;

use common::{drain, init_tracing, outputs, recv_until, states};
use tend::errors::TendError;
use tend::supervisor::{KILL_GRACE, RESTART_DELAY, Supervisor, SupervisorEvent};
use tend::types::{OutputStream, State};
use tend_test_utils::builders::CommandSpecBuilder;
use tend_test_utils::{FakeBackend, FakeWatcher, KillRecord, Script, fake_context, wait_until};

fn is_closed(name: &str) -> impl FnMut(&SupervisorEvent) -> bool + '_ {
    move |e| matches!(e, SupervisorEvent::Closed { name: n, .. } if n == name)
}

#[tokio::test]
async fn second_start_is_rejected() {
    init_tracing();
    let backend = FakeBackend::new();
    let watcher = FakeWatcher::new();
    let mut sup = Supervisor::new(
        CommandSpecBuilder::new("web").build(),
        fake_context(&backend, &watcher),
    );

    let (tx, _rx) = mpsc::channel(16);
    let handle = sup.start(tx.clone()).expect("first start succeeds");

    match sup.start(tx) {
        Err(TendError::AlreadyStarted(name)) => assert_eq!(name, "web"),
        other => panic!("expected AlreadyStarted, got {other:?}"),
    }

    handle.shutdown().await;
    assert_eq!(backend.spawn_count("web"), 1);
}

#[tokio::test]
async fn initial_state_depends_on_install_steps() {
    let backend = FakeBackend::new();
    let watcher = FakeWatcher::new();
    let ctx = fake_context(&backend, &watcher);

    let plain = Supervisor::new(CommandSpecBuilder::new("api").build(), ctx.clone());
    assert_eq!(plain.initial_state(), State::Initializing);

    let with_install = Supervisor::new(
        CommandSpecBuilder::new("web")
            .install(CommandSpecBuilder::new("deps").build())
            .build(),
        ctx,
    );
    assert_eq!(with_install.initial_state(), State::Installing);
}

#[tokio::test(start_paused = true)]
async fn output_drives_state_transitions() {
    init_tracing();
    let backend = FakeBackend::new();
    backend.script(
        "web",
        Script::new()
            .stdout("Compiling modules")
            .stdout("webpack compiled successfully"),
    );
    let watcher = FakeWatcher::new();
    let spec = CommandSpecBuilder::new("web")
        .ready("compiled successfully")
        .building("compiling")
        .build();
    let mut sup = Supervisor::new(spec, fake_context(&backend, &watcher));

    let (tx, mut rx) = mpsc::channel(64);
    let handle = sup.start(tx).unwrap();

    let events = recv_until(&mut rx, |e| {
        matches!(e, SupervisorEvent::State { state: State::Ready, .. })
    })
    .await;

    assert_eq!(
        states(&events),
        vec![
            ("web".to_string(), "building".to_string()),
            ("web".to_string(), "ready".to_string()),
        ]
    );
    // Output is reported before the state change it causes.
    assert!(matches!(
        &events[0],
        SupervisorEvent::Output { stream: OutputStream::Stdout, data, .. } if data == "Compiling modules"
    ));

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn ready_wins_over_failed_on_the_same_line() {
    let backend = FakeBackend::new();
    backend.script("web", Script::new().stderr("error overlay: compiled successfully"));
    let watcher = FakeWatcher::new();
    let spec = CommandSpecBuilder::new("web")
        .ready("compiled successfully")
        .failed("error")
        .build();
    let mut sup = Supervisor::new(spec, fake_context(&backend, &watcher));

    let (tx, mut rx) = mpsc::channel(64);
    let handle = sup.start(tx).unwrap();

    let events = recv_until(&mut rx, |e| matches!(e, SupervisorEvent::State { .. })).await;
    assert_eq!(states(&events), vec![("web".to_string(), "ready".to_string())]);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn crash_hands_out_restart_that_respawns_after_fixed_delay() {
    init_tracing();
    let backend = FakeBackend::new();
    backend.script("api", Script::new().stdout("boom").exit(1));
    let watcher = FakeWatcher::new();
    let mut sup = Supervisor::new(
        CommandSpecBuilder::new("api").build(),
        fake_context(&backend, &watcher),
    );

    let (tx, mut rx) = mpsc::channel(64);
    let handle = sup.start(tx).unwrap();

    let mut events = recv_until(&mut rx, is_closed("api")).await;
    assert_eq!(states(&events), vec![("api".to_string(), "closed".to_string())]);

    let Some(SupervisorEvent::Closed { code, restart, .. }) = events.pop() else {
        panic!("last event should be Closed");
    };
    assert_eq!(code, 1);
    let restart = restart.expect("a crash carries a restart handle");
    assert_eq!(restart.delay(), RESTART_DELAY);

    // Nothing happens until someone asks for the restart.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(backend.spawn_count("api"), 1);

    restart.restart();
    tokio::time::sleep(Duration::from_millis(900)).await;
    assert_eq!(backend.spawn_count("api"), 1);

    wait_until(|| backend.spawn_count("api") == 2).await;
    let spawns = backend.spawns();
    let gap = spawns[1].at - spawns[0].at;
    assert!(gap >= Duration::from_secs(6), "respawned too early: {gap:?}");

    let events = recv_until(&mut rx, |e| matches!(e, SupervisorEvent::State { .. })).await;
    assert_eq!(states(&events), vec![("api".to_string(), "initializing".to_string())]);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn spawn_failure_is_reported_as_exit_minus_one() {
    let backend = FakeBackend::new();
    backend.fail_spawn("ghost");
    let watcher = FakeWatcher::new();
    let mut sup = Supervisor::new(
        CommandSpecBuilder::new("ghost").build(),
        fake_context(&backend, &watcher),
    );

    let (tx, mut rx) = mpsc::channel(64);
    let handle = sup.start(tx).unwrap();

    let events = recv_until(&mut rx, is_closed("ghost")).await;
    assert!(outputs(&events)[0].starts_with("failed to start:"));
    match events.last() {
        Some(SupervisorEvent::Closed { code, restart, .. }) => {
            assert_eq!(*code, -1);
            assert!(restart.is_some());
        }
        other => panic!("expected Closed, got {other:?}"),
    }

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn watched_change_kills_tree_and_respawns_immediately() {
    init_tracing();
    let backend = FakeBackend::new();
    let watcher = FakeWatcher::new();
    let spec = CommandSpecBuilder::new("web").watch("/proj", "src").build();
    let mut sup = Supervisor::new(spec, fake_context(&backend, &watcher));

    let (tx, mut rx) = mpsc::channel(64);
    let handle = sup.start(tx).unwrap();

    wait_until(|| watcher.is_subscribed("web")).await;
    assert!(watcher.trigger("web", "/proj/src/main.rs"));
    wait_until(|| backend.spawn_count("web") == 2).await;

    assert_eq!(
        backend.kills(),
        vec![KillRecord {
            name: "web".to_string(),
            force: false
        }]
    );
    let spawns = backend.spawns();
    assert!(spawns[1].at - spawns[0].at < RESTART_DELAY);

    let events = drain(&mut rx);
    assert_eq!(
        outputs(&events),
        vec!["[autoreload] change detected in src/main.rs, restarting".to_string()]
    );
    assert!(
        !events.iter().any(|e| matches!(e, SupervisorEvent::Closed { .. })),
        "a planned restart is not a crash: {events:?}"
    );

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn burst_of_changes_restarts_once() {
    let backend = FakeBackend::new();
    let watcher = FakeWatcher::new();
    let spec = CommandSpecBuilder::new("web").watch("/proj", "src").build();
    let mut sup = Supervisor::new(spec, fake_context(&backend, &watcher));

    let (tx, _rx) = mpsc::channel(64);
    let handle = sup.start(tx).unwrap();

    wait_until(|| watcher.is_subscribed("web")).await;
    for i in 0..5 {
        watcher.trigger("web", format!("/proj/src/file{i}.rs"));
    }
    wait_until(|| backend.spawn_count("web") == 2).await;
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(backend.spawn_count("web"), 2);
    assert_eq!(backend.kills().len(), 1);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn stubborn_process_is_force_killed_after_grace() {
    let backend = FakeBackend::new();
    backend.ignore_term("web");
    let watcher = FakeWatcher::new();
    let spec = CommandSpecBuilder::new("web").watch("/proj", "src").build();
    let mut sup = Supervisor::new(spec, fake_context(&backend, &watcher));

    let (tx, _rx) = mpsc::channel(64);
    let handle = sup.start(tx).unwrap();

    wait_until(|| watcher.is_subscribed("web")).await;
    watcher.trigger("web", "/proj/src/lib.rs");
    wait_until(|| backend.spawn_count("web") == 2).await;

    let forced: Vec<bool> = backend.kills().iter().map(|k| k.force).collect();
    assert_eq!(forced, vec![false, true]);
    let spawns = backend.spawns();
    assert!(spawns[1].at - spawns[0].at >= KILL_GRACE);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn last_words_of_a_reloaded_process_are_kept() {
    let backend = FakeBackend::new();
    backend.ignore_term("web");
    let watcher = FakeWatcher::new();
    let spec = CommandSpecBuilder::new("web")
        .ready("ready")
        .watch("/proj", "src")
        .build();
    let mut sup = Supervisor::new(spec, fake_context(&backend, &watcher));

    let (tx, mut rx) = mpsc::channel(64);
    let handle = sup.start(tx).unwrap();

    wait_until(|| watcher.is_subscribed("web")).await;
    let dying = backend.process("web").expect("web is running");
    watcher.trigger("web", "/proj/src/lib.rs");
    wait_until(|| backend.kills().len() == 1).await;

    dying.stdout("flushing cache, ready to exit");
    dying.exit(0);
    wait_until(|| backend.spawn_count("web") == 2).await;

    let events = drain(&mut rx);
    assert_eq!(
        outputs(&events),
        vec![
            "[autoreload] change detected in src/lib.rs, restarting".to_string(),
            "flushing cache, ready to exit".to_string(),
        ]
    );
    // Output from a process on its way out does not classify.
    assert!(!states(&events).contains(&("web".to_string(), "ready".to_string())));

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_kills_live_process() {
    let backend = FakeBackend::new();
    let watcher = FakeWatcher::new();
    let mut sup = Supervisor::new(
        CommandSpecBuilder::new("worker").build(),
        fake_context(&backend, &watcher),
    );

    let (tx, _rx) = mpsc::channel(64);
    let handle = sup.start(tx).unwrap();
    wait_until(|| backend.live() == 1).await;

    handle.shutdown().await;

    assert_eq!(backend.live(), 0);
    assert_eq!(backend.kills().len(), 1);
}
