// src/tools/mod.rs

//! External tool collaborators.
//!
//! Type-checking and bundling are delegated to external programs. The
//! pipeline only sees the [`Compiler`] and [`Bundler`] traits, so tests can
//! swap in fakes that never spawn a process.

use std::fmt::Debug;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::ProjectConfig;
use crate::errors::Result;

pub mod bundler;
pub mod compiler;
pub mod process;

pub use bundler::EsbuildBundler;
pub use compiler::TscCompiler;

pub type ToolFuture = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

/// Inputs for one compiler run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    pub root: PathBuf,
    pub tsconfig: PathBuf,
    pub out_dir: PathBuf,
    /// Files of the source path-set, absolute and sorted.
    pub sources: Vec<PathBuf>,
}

/// Inputs for one bundler run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleRequest {
    pub root: PathBuf,
    pub entry: PathBuf,
    pub outfile: PathBuf,
    pub global_name: String,
    /// Emitted once, before any code.
    pub banner: String,
    pub target: String,
    pub minify: bool,
    pub sourcemap: bool,
}

/// Type-checks and transpiles sources into the intermediate directory.
///
/// Failures are reported as `CompileError` carrying the tool's diagnostics.
pub trait Compiler: Send + Sync + Debug {
    fn compile(&self, request: CompileRequest) -> ToolFuture;
}

/// Packages compiled output into a single artifact.
///
/// Failures are reported as `BundleError` carrying the tool's output.
pub trait Bundler: Send + Sync + Debug {
    fn bundle(&self, request: BundleRequest) -> ToolFuture;
}

/// The pair of external collaborators the pipeline drives.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub compiler: Arc<dyn Compiler>,
    pub bundler: Arc<dyn Bundler>,
}

impl Toolchain {
    pub fn new(compiler: Arc<dyn Compiler>, bundler: Arc<dyn Bundler>) -> Self {
        Self { compiler, bundler }
    }

    /// Process-backed tools as configured in `[compile]` and `[bundle]`.
    pub fn from_config(config: &ProjectConfig) -> Self {
        Self {
            compiler: Arc::new(TscCompiler::new(config.compile().clone())),
            bundler: Arc::new(EsbuildBundler::new(config.bundle().clone())),
        }
    }
}
