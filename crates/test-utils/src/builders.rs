#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use devpipe::config::model::default_path_sets;
use devpipe::config::{build_project, PathSetConfig, ProjectConfig, RawConfigFile};
use devpipe::fs::RealFileSystem;
use devpipe::types::BuildMode;
use tempfile::TempDir;

/// Builder for a throwaway project directory plus its validated config.
///
/// Defaults: package `simple@1.0.0`, the standard `static_html` + `core`
/// path-sets, a 100ms debounce and an ephemeral server port.
pub struct ProjectBuilder {
    raw: RawConfigFile,
    files: Vec<(String, Vec<u8>)>,
    package: Option<(String, String)>,
    mode: BuildMode,
}

impl ProjectBuilder {
    pub fn new() -> Self {
        let mut raw = RawConfigFile::default();
        raw.path_set = default_path_sets();
        raw.watch.debounce = "100ms".to_string();
        raw.serve.port = 0;

        Self {
            raw,
            files: Vec::new(),
            package: Some(("simple".to_string(), "1.0.0".to_string())),
            mode: BuildMode::Development,
        }
    }

    /// Add a file relative to the project root.
    pub fn file(mut self, rel: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.files.push((rel.to_string(), contents.into()));
        self
    }

    pub fn package(mut self, name: &str, version: &str) -> Self {
        self.package = Some((name.to_string(), version.to_string()));
        self
    }

    pub fn without_package(mut self) -> Self {
        self.package = None;
        self
    }

    /// Add or replace a path-set.
    pub fn path_set(mut self, name: &str, set: PathSetConfig) -> Self {
        self.raw.path_set.insert(name.to_string(), set);
        self
    }

    pub fn without_path_set(mut self, name: &str) -> Self {
        self.raw.path_set.remove(name);
        self
    }

    pub fn debounce(mut self, value: &str) -> Self {
        self.raw.watch.debounce = value.to_string();
        self
    }

    pub fn mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    /// Direct access for settings without a dedicated method.
    pub fn raw_mut(&mut self) -> &mut RawConfigFile {
        &mut self.raw
    }

    pub fn build(self) -> Result<TestProject> {
        let dir = TempDir::new().context("creating temp project dir")?;
        let root = dir.path().canonicalize().context("canonicalizing temp dir")?;

        if let Some((name, version)) = &self.package {
            write_file(
                &root,
                "package.json",
                format!(r#"{{"name": "{name}", "version": "{version}"}}"#).as_bytes(),
            )?;
        }
        for (rel, contents) in &self.files {
            write_file(&root, rel, contents)?;
        }

        let config = build_project(self.raw, &root, self.mode, &RealFileSystem)
            .context("building project config")?;

        Ok(TestProject {
            dir,
            root,
            config: Arc::new(config),
        })
    }
}

impl Default for ProjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A project on disk. The directory is removed on drop.
pub struct TestProject {
    dir: TempDir,
    root: PathBuf,
    pub config: Arc<ProjectConfig>,
}

impl TestProject {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    pub fn read(&self, rel: &str) -> Option<String> {
        fs::read_to_string(self.path(rel)).ok()
    }

    pub fn write(&self, rel: &str, contents: &str) -> Result<()> {
        write_file(&self.root, rel, contents.as_bytes())
    }

    pub fn remove_dir(&self, rel: &str) -> Result<()> {
        fs::remove_dir_all(self.path(rel)).with_context(|| format!("removing {rel}"))
    }
}

/// Write `contents` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &[u8]) -> Result<()> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {parent:?}"))?;
    }
    fs::write(&path, contents).with_context(|| format!("writing {path:?}"))
}
