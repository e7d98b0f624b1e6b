// src/tasks/copy.rs

use std::path::Path;

use tracing::{debug, info};

use crate::config::PathSet;
use crate::errors::{DevpipeError, Result};
use crate::fs::FileSystem;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{collect_matching_files, PathSetMatcher};

/// Copy a static path-set into its destination directory.
///
/// Returns the number of files copied.
pub fn copy_path_set(fs: &dyn FileSystem, root: &Path, set: &PathSet) -> Result<usize> {
    let dest = set.dest().ok_or_else(|| {
        DevpipeError::ConfigError(format!(
            "path-set '{}' has no destination and cannot be copied",
            set.name()
        ))
    })?;

    let copied = copy_matching(fs, root, set.matcher(), dest)?;
    info!(path_set = %set.name(), copied, dest = %dest.display(), "copied static files");
    Ok(copied)
}

/// Copy every file under `root` matched by `matcher` into `dest`, keeping the
/// layout below each pattern's glob base.
///
/// Existing files are overwritten and files already in `dest` are left alone.
/// A matcher whose bases do not exist copies nothing.
pub fn copy_matching(
    fs: &dyn FileSystem,
    root: &Path,
    matcher: &PathSetMatcher,
    dest: &Path,
) -> Result<usize> {
    let files = collect_matching_files(fs, root, matcher).map_err(|e| DevpipeError::io(root, e))?;

    let mut copied = 0;
    for source in files {
        let Some(rel) = relative_str(root, &source) else {
            continue;
        };
        let Some(base) = matcher.base_for(&rel) else {
            continue;
        };

        let rel_path = Path::new(&rel);
        let below_base = rel_path.strip_prefix(base).unwrap_or(rel_path);
        let target = dest.join(below_base);

        if let Some(parent) = target.parent() {
            fs.create_dir_all(parent)
                .map_err(|e| DevpipeError::io(parent, e))?;
        }
        fs.copy_file(&source, &target)
            .map_err(|e| DevpipeError::io(failed_side(fs, &source, &target), e))?;

        debug!(from = %source.display(), to = %target.display(), "copied");
        copied += 1;
    }

    Ok(copied)
}

/// Which end of a failed copy to blame: the source if it cannot be read,
/// otherwise the target.
fn failed_side<'a>(fs: &dyn FileSystem, source: &'a Path, target: &'a Path) -> &'a Path {
    if fs.read(source).is_err() {
        source
    } else {
        target
    }
}
