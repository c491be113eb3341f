// tests/cli.rs

use clap::Parser;
use tracing::Level;

use tend::cli::{CliArgs, LogLevel};
use tend::config::DEFAULT_CONFIG_FILE;
use tend::logging::resolve_level;
use tend::manager::merge_filters;
use tend::write_dry_run;
use tend_test_utils::builders::CommandSpecBuilder;

#[test]
fn defaults() {
    let args = CliArgs::try_parse_from(["tend"]).unwrap();
    assert_eq!(args.config, DEFAULT_CONFIG_FILE);
    assert_eq!(DEFAULT_CONFIG_FILE, "tend.toml");
    assert!(args.filters.is_empty());
    assert!(!args.dry_run);
    assert!(args.log_level.is_none());
}

#[test]
fn positional_filters_and_flags() {
    let args = CliArgs::try_parse_from([
        "tend",
        "--config",
        "dev/tend.toml",
        "--log-level",
        "debug",
        "--dry-run",
        "web",
        "*-svc",
    ])
    .unwrap();
    assert_eq!(args.config, "dev/tend.toml");
    assert_eq!(args.filters, vec!["web", "*-svc"]);
    assert!(args.dry_run);
    assert!(matches!(args.log_level, Some(LogLevel::Debug)));
}

#[test]
fn log_level_priority() {
    assert_eq!(resolve_level(None, None), Level::WARN);
    assert_eq!(resolve_level(None, Some("info")), Level::INFO);
    assert_eq!(resolve_level(None, Some(" DEBUG ")), Level::DEBUG);
    assert_eq!(resolve_level(None, Some("nonsense")), Level::WARN);
    assert_eq!(resolve_level(Some(LogLevel::Trace), Some("info")), Level::TRACE);
}

#[test]
fn filters_are_unioned_without_duplicates() {
    let config = vec!["*-svc".to_string(), "web".to_string()];
    let cli = vec!["web".to_string(), "docs".to_string()];
    assert_eq!(merge_filters(&config, &cli), vec!["*-svc", "web", "docs"]);
    assert!(merge_filters(&[], &[]).is_empty());
}

#[test]
fn dry_run_lists_commands() {
    let web = CommandSpecBuilder::new("web")
        .command("npm")
        .arg("run")
        .arg("dev")
        .tag("frontend")
        .install(CommandSpecBuilder::new("deps").command("npm").arg("install").build())
        .watch("/proj", "src")
        .build();
    let api = CommandSpecBuilder::new("api").command("cargo").arg("run").build();

    let mut out = Vec::new();
    write_dry_run(&mut out, &[&web, &api]).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.starts_with("tend dry-run\ncommands (2):\n"));
    assert!(text.contains("  - web\n      run: npm run dev\n      tags: frontend\n"));
    assert!(text.contains("      install deps: npm install\n"));
    assert!(text.contains("      watch: src\n"));
    assert!(text.contains("  - api\n      run: cargo run\n"));
}
