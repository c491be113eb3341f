// src/watch/mod.rs

//! File watching for autoreload.
//!
//! This module is responsible for:
//! - Resolving a command's `watch` paths and globs against its directory.
//! - Applying the ignore list (dependency trees are always excluded).
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//!
//! It does **not** restart anything itself; it only turns filesystem changes
//! into [`ChangeEvent`]s for the owning supervisor.

pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use patterns::{split_glob, WatchProfile, WatchTarget, DEFAULT_IGNORED};
pub use watcher::{ChangeEvent, ChangeWatcher, NotifyWatcher, WatchSubscription};
