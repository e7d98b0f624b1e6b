// src/watch/mod.rs

//! File watching and change debouncing.
//!
//! This module is responsible for:
//! - Compiling path-set glob patterns (`patterns.rs`).
//! - The pure per-watch state machine (`core.rs`) and its async shell
//!   (`runner.rs`).
//! - Wiring up a cross-platform filesystem watcher (`notify`) per path-set.
//! - The optional content-hash gate (`hash.rs`).
//!
//! It does not know what a trigger does; it only decides *when* to run it.

pub mod core;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod runner;
pub mod watcher;

pub use self::core::{RunOutcome, WatchCommand, WatchCore, WatchEvent, WatchState, WatchStep};
pub use hash::{compute_path_set_hash, ContentGate};
pub use patterns::{collect_matching_files, glob_base, PathSetMatcher};
pub use runner::{spawn_watch, ChangeSender, Trigger, WatchHandle, WatchOptions};
pub use watcher::arm;
