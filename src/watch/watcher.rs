// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use notify::event::EventKind;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::config::PathSet;
use crate::fs::FileSystem;
use crate::watch::hash::ContentGate;
use crate::watch::path_utils::relative_str;
use crate::watch::runner::{spawn_watch, Trigger, WatchHandle, WatchOptions};

/// Arm a filesystem watch over `set`.
///
/// Each pattern's glob base under `root` is watched recursively; if none of
/// them exist yet, `root` itself is watched so that creating them is noticed.
/// Matching changes are debounced by the set's `debounce` before `trigger`
/// runs.
pub fn arm(
    root: &Path,
    set: &PathSet,
    fs: Arc<dyn FileSystem>,
    trigger: Trigger,
) -> Result<WatchHandle> {
    // Canonicalize once so we have a stable base path.
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());

    let gate = set
        .use_hash()
        .then(|| ContentGate::new(Arc::clone(&fs), root.clone(), set.matcher().clone()));

    let options = WatchOptions {
        name: set.name().to_string(),
        debounce: set.debounce(),
        gate,
    };
    let (mut handle, change_tx) = spawn_watch(options, trigger);

    // Closure called synchronously by notify whenever an event arrives.
    let matcher = set.matcher().clone();
    let callback_root = root.clone();
    let set_name = set.name().to_string();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if matches!(event.kind, EventKind::Access(_)) {
                    return;
                }
                let relevant = event.paths.iter().any(|path| {
                    relative_str(&callback_root, path).is_some_and(|rel| matcher.matches(&rel))
                });
                if relevant {
                    debug!(watch = %set_name, paths = ?event.paths, "matching change");
                    // The receiver is gone once the watch is cancelled.
                    let _ = change_tx.send(());
                }
            }
            Err(err) => {
                warn!(watch = %set_name, error = %err, "file watch error");
            }
        },
        Config::default(),
    )
    .context("creating filesystem watcher")?;

    for dir in watch_dirs(&root, set) {
        watcher
            .watch(&dir, RecursiveMode::Recursive)
            .with_context(|| format!("watching {dir:?}"))?;
        info!(watch = %set.name(), dir = %dir.display(), "watching directory");
    }

    handle.attach_watcher(watcher);
    Ok(handle)
}

fn watch_dirs(root: &Path, set: &PathSet) -> Vec<PathBuf> {
    let existing: Vec<PathBuf> = set
        .matcher()
        .roots()
        .into_iter()
        .map(|base| root.join(base))
        .filter(|dir| dir.is_dir())
        .collect();

    if existing.is_empty() {
        vec![root.to_path_buf()]
    } else {
        existing
    }
}
