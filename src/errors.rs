// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DevpipeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A filesystem operation failed for a reason other than "not found".
    #[error("IO error at {path:?}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Compiler diagnostics, surfaced verbatim.
    #[error("Compile error:\n{0}")]
    CompileError(String),

    /// Bundler output, surfaced verbatim.
    #[error("Bundle error:\n{0}")]
    BundleError(String),

    #[error("Cycle detected in pipelines: {0}")]
    PipelineCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DevpipeError {
    /// Attach the offending path to an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DevpipeError::IoError {
            path: path.into(),
            source,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DevpipeError>;
