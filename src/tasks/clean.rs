// src/tasks/clean.rs

use std::io;
use std::path::Path;

use tracing::{debug, info};

use crate::errors::{DevpipeError, Result};
use crate::fs::FileSystem;

/// Recursively delete the directory at `path`.
///
/// An absent directory is a successful no-op, including when it vanishes
/// between the existence check and the removal.
pub fn clean(fs: &dyn FileSystem, path: &Path) -> Result<()> {
    if !fs.exists(path) {
        debug!(path = %path.display(), "nothing to clean");
        return Ok(());
    }

    match fs.remove_dir_all(path) {
        Ok(()) => {
            info!(path = %path.display(), "cleaned");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "directory disappeared before removal");
            Ok(())
        }
        Err(e) => Err(DevpipeError::io(path, e)),
    }
}

/// Clean `path`, then recreate it as an empty directory.
///
/// Output directories stay present after a build that produced nothing, so
/// the server always has a root to serve.
pub fn reset(fs: &dyn FileSystem, path: &Path) -> Result<()> {
    clean(fs, path)?;
    fs.create_dir_all(path)
        .map_err(|e| DevpipeError::io(path, e))
}
