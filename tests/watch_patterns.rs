// tests/watch_patterns.rs

mod common;

use std::fs;
use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;

use common::init_tracing;
use tend::command::WatchSpec;
use tend::watch::{ChangeWatcher, NotifyWatcher, WatchProfile, split_glob};

fn spec(base: &Path, paths: &[&str], ignored: &[&str]) -> WatchSpec {
    WatchSpec {
        paths: paths.iter().map(|p| p.to_string()).collect(),
        ignored: ignored.iter().map(|p| p.to_string()).collect(),
        base_dir: base.to_path_buf(),
    }
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    for file in [
        "src/main.rs",
        "src/app/view.tsx",
        "src/debug.log",
        "node_modules/pkg/index.js",
        "src/node_modules/inner.js",
        "README.md",
    ] {
        let path = dir.path().join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }
    dir
}

#[test]
fn split_glob_separates_literal_base() {
    assert_eq!(split_glob("src"), ("src".to_string(), None));
    assert_eq!(split_glob("src/"), ("src".to_string(), None));
    assert_eq!(
        split_glob("src/**/*.rs"),
        ("src".to_string(), Some("**/*.rs".to_string()))
    );
    assert_eq!(split_glob("*.toml"), (String::new(), Some("*.toml".to_string())));
    assert_eq!(
        split_glob("web\\src\\*.tsx"),
        ("web/src".to_string(), Some("*.tsx".to_string()))
    );
}

#[test]
fn plain_path_matches_everything_below_it() {
    let dir = project();
    let root = dir.path().canonicalize().unwrap();
    let profile = WatchProfile::from_spec(&spec(&root, &["src"], &[])).unwrap();

    assert!(profile.matches(&root.join("src/main.rs")));
    assert!(profile.matches(&root.join("src/app/view.tsx")));
    assert!(!profile.matches(&root.join("README.md")));
}

#[test]
fn node_modules_is_always_ignored() {
    let dir = project();
    let root = dir.path().canonicalize().unwrap();
    let profile = WatchProfile::from_spec(&spec(&root, &["."], &[])).unwrap();

    assert!(profile.matches(&root.join("README.md")));
    assert!(profile.is_ignored(&root.join("node_modules/pkg/index.js")));
    assert!(!profile.matches(&root.join("node_modules/pkg/index.js")));
    assert!(!profile.matches(&root.join("src/node_modules/inner.js")));
}

#[test]
fn configured_ignores_apply() {
    let dir = project();
    let root = dir.path().canonicalize().unwrap();
    let profile = WatchProfile::from_spec(&spec(&root, &["src"], &["**/*.log"])).unwrap();

    assert!(profile.matches(&root.join("src/main.rs")));
    assert!(!profile.matches(&root.join("src/debug.log")));
}

#[test]
fn glob_targets_filter_by_pattern() {
    let dir = project();
    let root = dir.path().canonicalize().unwrap();
    let profile = WatchProfile::from_spec(&spec(&root, &["src/**/*.tsx"], &[])).unwrap();

    assert_eq!(profile.targets().len(), 1);
    assert_eq!(profile.targets()[0].root(), root.join("src"));
    assert!(profile.matches(&root.join("src/app/view.tsx")));
    assert!(!profile.matches(&root.join("src/main.rs")));
}

#[tokio::test]
async fn notify_watcher_reports_changes_under_watched_path() {
    init_tracing();
    let dir = project();
    let root = dir.path().canonicalize().unwrap();
    let mut sub = NotifyWatcher::new()
        .subscribe("web", &spec(&root, &["src"], &[]))
        .unwrap();

    // Give the OS watcher a moment to register.
    tokio::time::sleep(Duration::from_millis(200)).await;
    fs::write(root.join("src/main.rs"), "changed").unwrap();

    let change = tokio::time::timeout(Duration::from_secs(10), sub.recv())
        .await
        .expect("no change event within 10s")
        .expect("watcher channel closed");
    assert!(change.path.ends_with("src/main.rs"), "{:?}", change.path);
}

#[tokio::test]
async fn files_present_when_watching_starts_are_not_reported() {
    init_tracing();
    let dir = project();
    let root = dir.path().canonicalize().unwrap();
    let mut sub = NotifyWatcher::new()
        .subscribe("web", &spec(&root, &["src"], &[]))
        .unwrap();

    let quiet = tokio::time::timeout(Duration::from_millis(500), sub.recv()).await;
    assert!(quiet.is_err(), "unexpected change event: {quiet:?}");
}

#[test]
fn missing_watch_root_is_skipped() {
    let dir = TempDir::new().unwrap();
    let result = NotifyWatcher::new().subscribe("web", &spec(dir.path(), &["does-not-exist"], &[]));
    assert!(result.is_ok());
}
