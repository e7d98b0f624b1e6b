// src/watch/hash.rs

//! Content hashing for the optional `use_hash` gate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;
use crate::watch::patterns::{collect_matching_files, PathSetMatcher};

/// Hash a single file's contents.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let bytes = fs
        .read(path)
        .with_context(|| format!("reading file for hashing: {path:?}"))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Aggregate hash over every file of a path-set.
///
/// Files are visited in sorted order and each contributes its relative path
/// and content hash, so renames change the result too.
pub fn compute_path_set_hash(
    fs: &dyn FileSystem,
    root: &Path,
    matcher: &PathSetMatcher,
) -> Result<String> {
    let files = collect_matching_files(fs, root, matcher)
        .with_context(|| format!("listing files under {root:?}"))?;

    let mut hasher = Hasher::new();
    for path in &files {
        let rel = path.strip_prefix(root).unwrap_or(path);
        hasher.update(rel.to_string_lossy().as_bytes());
        hasher.update(compute_file_hash(fs, path)?.as_bytes());
    }

    let hash = hasher.finalize().to_hex().to_string();
    debug!(files = files.len(), hash = %hash, "computed aggregate hash");
    Ok(hash)
}

/// Skips runs whose inputs have not changed since the last started run.
///
/// Only the hash of the last started run is kept, in memory.
#[derive(Debug, Clone)]
pub struct ContentGate {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    matcher: PathSetMatcher,
    last: Option<String>,
}

impl ContentGate {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>, matcher: PathSetMatcher) -> Self {
        Self {
            fs,
            root: root.into(),
            matcher,
            last: None,
        }
    }

    /// Record the current hash, returning `true` if it differs from the last
    /// recorded one. A hashing failure counts as changed.
    pub async fn check_and_record(&mut self) -> bool {
        let fs = Arc::clone(&self.fs);
        let root = self.root.clone();
        let matcher = self.matcher.clone();

        let hashed = tokio::task::spawn_blocking(move || {
            compute_path_set_hash(fs.as_ref(), &root, &matcher)
        })
        .await;

        let current = match hashed {
            Ok(Ok(hash)) => hash,
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "content hash failed; treating as changed");
                self.last = None;
                return true;
            }
            Err(err) => {
                tracing::warn!(error = %err, "content hash task failed; treating as changed");
                self.last = None;
                return true;
            }
        };

        if self.last.as_deref() == Some(current.as_str()) {
            return false;
        }
        self.last = Some(current);
        true
    }

    /// Drop the recorded hash so the next check always passes. Called when
    /// a run fails, so saving the same inputs again retries it.
    pub fn forget(&mut self) {
        self.last = None;
    }
}
