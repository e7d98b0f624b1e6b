// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::RawConfigFile;
use crate::config::project::ProjectConfig;
use crate::config::validate::build_project;
use crate::errors::{DevpipeError, Result};
use crate::fs::RealFileSystem;
use crate::types::BuildMode;

/// Default config file name, looked up in the current working directory.
pub const DEFAULT_CONFIG_FILE: &str = "Devpipe.toml";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| DevpipeError::io(path, e))?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load the raw config, falling back to built-in defaults.
///
/// A missing file is only acceptable when the user did not name it
/// explicitly (`required == false`).
pub fn load_or_default(path: impl AsRef<Path>, required: bool) -> Result<RawConfigFile> {
    let path = path.as_ref();
    if path.exists() {
        return load_from_path(path);
    }
    if required {
        return Err(DevpipeError::ConfigError(format!(
            "config file {path:?} does not exist"
        )));
    }
    Ok(RawConfigFile::default())
}

/// Load a configuration file from path and validate it against the project
/// on disk.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML (or uses defaults when an implicit config file is absent).
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Reads `package.json` and checks path-set / output-directory invariants.
pub fn load_and_validate(
    path: impl AsRef<Path>,
    required: bool,
    mode: BuildMode,
) -> Result<ProjectConfig> {
    let path = path.as_ref();
    let raw = load_or_default(path, required)?;
    build_project(raw, &config_root_dir(path), mode, &RealFileSystem)
}

/// Figure out the directory relative paths in the config are resolved against.
///
/// - If the config path has a non-empty parent (e.g. "web/Devpipe.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Devpipe.toml" (parent = ""),
///   we fall back to the current working directory.
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
