// src/config/project.rs

//! The validated, immutable project configuration.
//!
//! A [`ProjectConfig`] is built once at startup (see [`crate::config::validate`])
//! and then shared read-only, usually behind an `Arc`, by every component.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::{BuildMode, Name, PathSetKind};
use crate::watch::patterns::PathSetMatcher;

/// `name` and `version` from `package.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
}

impl PackageInfo {
    /// Header comment placed once at the top of the bundle.
    pub fn banner(&self) -> String {
        format!(
            "/*! @preserve\n * {}\n * version: {}\n */",
            self.name, self.version
        )
    }
}

/// A named group of files with a compiled matcher.
#[derive(Debug, Clone)]
pub struct PathSet {
    name: Name,
    kind: PathSetKind,
    matcher: PathSetMatcher,
    dest: Option<PathBuf>,
    use_hash: bool,
    debounce: Duration,
}

impl PathSet {
    pub(crate) fn new(
        name: Name,
        kind: PathSetKind,
        matcher: PathSetMatcher,
        dest: Option<PathBuf>,
        use_hash: bool,
        debounce: Duration,
    ) -> Self {
        Self {
            name,
            kind,
            matcher,
            dest,
            use_hash,
            debounce,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PathSetKind {
        self.kind
    }

    pub fn matcher(&self) -> &PathSetMatcher {
        &self.matcher
    }

    /// Absolute copy destination; `Some` exactly for static sets.
    pub fn dest(&self) -> Option<&Path> {
        self.dest.as_deref()
    }

    pub fn use_hash(&self) -> bool {
        self.use_hash
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }
}

/// Compiler invocation with placeholders already substituted.
#[derive(Debug, Clone)]
pub struct CompileSettings {
    pub program: String,
    pub args: Vec<String>,
}

/// Bundler invocation and artifact options. Paths are absolute.
#[derive(Debug, Clone)]
pub struct BundleSettings {
    pub program: String,
    pub args: Vec<String>,
    pub entry: PathBuf,
    pub outfile: PathBuf,
    pub target: String,
    pub sourcemap: bool,
    pub global_name: String,
}

#[derive(Debug, Clone)]
pub struct ServeSettings {
    pub host: String,
    pub port: u16,
    pub index: String,
}

#[derive(Debug, Clone)]
pub struct ProjectConfig {
    root: PathBuf,
    tsconfig: PathBuf,
    dist: PathBuf,
    out: PathBuf,
    mode: BuildMode,
    package: PackageInfo,
    path_sets: Vec<PathSet>,
    /// Index of the single source set in `path_sets`.
    source_index: usize,
    compile: CompileSettings,
    bundle: BundleSettings,
    serve: ServeSettings,
}

impl ProjectConfig {
    /// Assemble a config from already-validated parts.
    ///
    /// Use [`crate::config::validate::build_project`] instead of calling this
    /// directly.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new_unchecked(
        root: PathBuf,
        tsconfig: PathBuf,
        dist: PathBuf,
        out: PathBuf,
        mode: BuildMode,
        package: PackageInfo,
        path_sets: Vec<PathSet>,
        source_index: usize,
        compile: CompileSettings,
        bundle: BundleSettings,
        serve: ServeSettings,
    ) -> Self {
        Self {
            root,
            tsconfig,
            dist,
            out,
            mode,
            package,
            path_sets,
            source_index,
            compile,
            bundle,
            serve,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tsconfig(&self) -> &Path {
        &self.tsconfig
    }

    pub fn dist(&self) -> &Path {
        &self.dist
    }

    pub fn out(&self) -> &Path {
        &self.out
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    pub fn package(&self) -> &PackageInfo {
        &self.package
    }

    pub fn path_sets(&self) -> &[PathSet] {
        &self.path_sets
    }

    pub fn path_set(&self, name: &str) -> Option<&PathSet> {
        self.path_sets.iter().find(|s| s.name() == name)
    }

    pub fn static_sets(&self) -> impl Iterator<Item = &PathSet> {
        self.path_sets
            .iter()
            .filter(|s| s.kind() == PathSetKind::Static)
    }

    /// The single source path-set (validation guarantees exactly one).
    pub fn source_set(&self) -> &PathSet {
        &self.path_sets[self.source_index]
    }

    pub fn compile(&self) -> &CompileSettings {
        &self.compile
    }

    pub fn bundle(&self) -> &BundleSettings {
        &self.bundle
    }

    pub fn serve(&self) -> &ServeSettings {
        &self.serve
    }
}
