// src/config/mod.rs

//! Configuration loading and validation for devpipe.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate invariants and resolve paths (`validate.rs`) into the
//!   immutable [`ProjectConfig`] (`project.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod project;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default, DEFAULT_CONFIG_FILE};
pub use model::{
    BundleSection, CompileSection, PathSetConfig, ProjectSection, RawConfigFile, ServeSection,
    WatchSection,
};
pub use project::{
    BundleSettings, CompileSettings, PackageInfo, PathSet, ProjectConfig, ServeSettings,
};
pub use validate::build_project;
