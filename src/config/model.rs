// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::PathSetKind;

/// Configuration exactly as read from `Devpipe.toml`.
///
/// ```toml
/// [project]
/// package_json = "package.json"
/// tsconfig = "tsconfig.json"
/// dist = "dist"
/// out = "out"
///
/// [watch]
/// debounce = "500ms"
///
/// [path_set.static_html]
/// kind = "static"
/// patterns = ["src/*.html"]
///
/// [path_set.core]
/// kind = "source"
/// patterns = ["src/**/*.ts"]
/// ```
///
/// Every section is optional; the defaults reproduce the usual
/// `src/` → `out/` → `dist/` layout.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub project: ProjectSection,

    #[serde(default)]
    pub compile: CompileSection,

    #[serde(default)]
    pub bundle: BundleSection,

    #[serde(default)]
    pub serve: ServeSection,

    #[serde(default)]
    pub watch: WatchSection,

    /// Named path-sets from `[path_set.<name>]`.
    ///
    /// When empty, the default `static_html` + `core` sets are used.
    #[serde(default)]
    pub path_set: BTreeMap<String, PathSetConfig>,
}

/// `[project]` section. All paths are relative to the project root.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
    /// Project root, relative to the directory holding the config file.
    #[serde(default = "default_root")]
    pub root: String,

    #[serde(default = "default_package_json")]
    pub package_json: String,

    #[serde(default = "default_tsconfig")]
    pub tsconfig: String,

    /// Distribution directory: served, and cleaned at the start of `build`.
    #[serde(default = "default_dist")]
    pub dist: String,

    /// Intermediate compiler output, cleaned before every compile.
    #[serde(default = "default_out")]
    pub out: String,
}

fn default_root() -> String {
    ".".to_string()
}

fn default_package_json() -> String {
    "package.json".to_string()
}

fn default_tsconfig() -> String {
    "tsconfig.json".to_string()
}

fn default_dist() -> String {
    "dist".to_string()
}

fn default_out() -> String {
    "out".to_string()
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            package_json: default_package_json(),
            tsconfig: default_tsconfig(),
            dist: default_dist(),
            out: default_out(),
        }
    }
}

/// `[compile]` section: how to invoke the TypeScript compiler.
///
/// `{tsconfig}` and `{out}` in `args` are replaced with absolute paths.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompileSection {
    #[serde(default = "default_compile_program")]
    pub program: String,

    #[serde(default = "default_compile_args")]
    pub args: Vec<String>,
}

fn default_compile_program() -> String {
    "npx".to_string()
}

fn default_compile_args() -> Vec<String> {
    ["tsc", "--project", "{tsconfig}", "--outDir", "{out}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for CompileSection {
    fn default() -> Self {
        Self {
            program: default_compile_program(),
            args: default_compile_args(),
        }
    }
}

/// `[bundle]` section: how to invoke the bundler and what it should produce.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundleSection {
    #[serde(default = "default_bundle_program")]
    pub program: String,

    /// Leading arguments; bundle flags are appended after these.
    #[serde(default = "default_bundle_args")]
    pub args: Vec<String>,

    /// Entry file, relative to the `out` directory.
    #[serde(default = "default_entry")]
    pub entry: String,

    /// Artifact file, relative to the `dist` directory.
    #[serde(default = "default_outfile")]
    pub outfile: String,

    #[serde(default = "default_target")]
    pub target: String,

    #[serde(default = "default_true")]
    pub sourcemap: bool,

    /// Global name for the IIFE; defaults to the package name.
    #[serde(default)]
    pub global_name: Option<String>,
}

fn default_bundle_program() -> String {
    "npx".to_string()
}

fn default_bundle_args() -> Vec<String> {
    vec!["esbuild".to_string()]
}

fn default_entry() -> String {
    "index.js".to_string()
}

fn default_outfile() -> String {
    "simple.umd.js".to_string()
}

fn default_target() -> String {
    "es2015".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for BundleSection {
    fn default() -> Self {
        Self {
            program: default_bundle_program(),
            args: default_bundle_args(),
            entry: default_entry(),
            outfile: default_outfile(),
            target: default_target(),
            sourcemap: true,
            global_name: None,
        }
    }
}

/// `[serve]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServeSection {
    #[serde(default = "default_host")]
    pub host: String,

    /// `0` picks a free port.
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_index")]
    pub index: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_index() -> String {
    "index.html".to_string()
}

impl Default for ServeSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            index: default_index(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// Quiet period before a change burst triggers, e.g. `"500ms"` or `"1s"`.
    #[serde(default = "default_debounce")]
    pub debounce: String,
}

fn default_debounce() -> String {
    "500ms".to_string()
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce: default_debounce(),
        }
    }
}

/// `[path_set.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathSetConfig {
    #[serde(default)]
    pub kind: PathSetKind,

    /// Glob patterns relative to the project root; a leading `!` excludes.
    pub patterns: Vec<String>,

    /// Copy destination for static sets; defaults to `project.dist`.
    #[serde(default)]
    pub dest: Option<String>,

    /// Only re-run when the matched files' contents actually changed.
    #[serde(default)]
    pub use_hash: bool,

    /// Per-set override of `[watch].debounce`.
    #[serde(default)]
    pub debounce: Option<String>,
}

impl PathSetConfig {
    pub fn new(kind: PathSetKind, patterns: &[&str]) -> Self {
        Self {
            kind,
            patterns: patterns.iter().map(|s| s.to_string()).collect(),
            dest: None,
            use_hash: false,
            debounce: None,
        }
    }
}

/// The path-sets used when the config declares none.
pub fn default_path_sets() -> BTreeMap<String, PathSetConfig> {
    let mut sets = BTreeMap::new();
    sets.insert(
        "static_html".to_string(),
        PathSetConfig::new(PathSetKind::Static, &["src/*.html"]),
    );
    sets.insert(
        "core".to_string(),
        PathSetConfig::new(PathSetKind::Source, &["src/**/*.ts"]),
    );
    sets
}
