//! In-process stand-ins for the compiler and bundler.
//!
//! Both write real files so the rest of the pipeline (bundle entry checks,
//! the server, watches) behaves as it would with the real tools.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use devpipe::errors::{DevpipeError, Result};
use devpipe::tools::{BundleRequest, Bundler, CompileRequest, Compiler, ToolFuture, Toolchain};

#[derive(Debug, Default)]
struct Behaviour {
    fail_with: Option<String>,
    delay: Duration,
}

#[derive(Debug, Default)]
struct CompilerState {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: Mutex<Vec<CompileRequest>>,
    behaviour: Mutex<Behaviour>,
}

/// "Compiles" each `.ts` source to `out/<path below src>.js` verbatim.
///
/// Clones share state, so a test can keep one and hand another to the
/// pipeline.
#[derive(Debug, Clone, Default)]
pub struct FakeCompiler {
    state: Arc<CompilerState>,
}

impl FakeCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping runs observed.
    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompileRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Make every following run fail with `message` (or succeed on `None`).
    pub fn fail_with(&self, message: Option<&str>) {
        self.state.behaviour.lock().unwrap().fail_with = message.map(str::to_string);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.state.behaviour.lock().unwrap().delay = delay;
    }
}

impl Compiler for FakeCompiler {
    fn compile(&self, request: CompileRequest) -> ToolFuture {
        let this = Arc::clone(&self.state);
        Box::pin(async move {
            this.calls.fetch_add(1, Ordering::SeqCst);
            let now = this.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            this.max_in_flight.fetch_max(now, Ordering::SeqCst);
            this.requests.lock().unwrap().push(request.clone());

            let (fail_with, delay) = {
                let b = this.behaviour.lock().unwrap();
                (b.fail_with.clone(), b.delay)
            };
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let result = match fail_with {
                Some(message) => Err(DevpipeError::CompileError(message)),
                None => transpile(&request),
            };
            this.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }
}

fn transpile(request: &CompileRequest) -> Result<()> {
    for source in &request.sources {
        if source.extension().and_then(|e| e.to_str()) != Some("ts") {
            continue;
        }
        let rel = below_src(&request.root, source);
        let target = request.out_dir.join(rel).with_extension("js");
        let text = fs::read_to_string(source).map_err(|e| DevpipeError::io(source, e))?;
        write(&target, text.as_bytes())?;
    }
    Ok(())
}

fn below_src(root: &Path, source: &Path) -> PathBuf {
    let rel = source.strip_prefix(root).unwrap_or(source);
    let mut components = rel.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "src" => components.as_path().to_path_buf(),
        _ => rel.to_path_buf(),
    }
}

fn write(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| DevpipeError::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| DevpipeError::io(path, e))
}

#[derive(Debug, Default)]
struct BundlerState {
    calls: AtomicUsize,
    requests: Mutex<Vec<BundleRequest>>,
    behaviour: Mutex<Behaviour>,
}

/// Wraps the entry in an IIFE under the banner, like the real bundler's
/// output shape.
#[derive(Debug, Clone, Default)]
pub struct FakeBundler {
    state: Arc<BundlerState>,
}

impl FakeBundler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<BundleRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn fail_with(&self, message: Option<&str>) {
        self.state.behaviour.lock().unwrap().fail_with = message.map(str::to_string);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.state.behaviour.lock().unwrap().delay = delay;
    }
}

impl Bundler for FakeBundler {
    fn bundle(&self, request: BundleRequest) -> ToolFuture {
        let this = Arc::clone(&self.state);
        Box::pin(async move {
            this.calls.fetch_add(1, Ordering::SeqCst);
            this.requests.lock().unwrap().push(request.clone());

            let (fail_with, delay) = {
                let b = this.behaviour.lock().unwrap();
                (b.fail_with.clone(), b.delay)
            };
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if let Some(message) = fail_with {
                return Err(DevpipeError::BundleError(message));
            }

            let code = fs::read_to_string(&request.entry)
                .map_err(|e| DevpipeError::io(&request.entry, e))?;
            let output = format!(
                "{}\n\"use strict\";\nvar {} = (() => {{\n{}\n}})();\n",
                request.banner,
                request.global_name,
                code.trim_end()
            );
            write(&request.outfile, output.as_bytes())?;

            if request.sourcemap {
                let mut map = request.outfile.clone().into_os_string();
                map.push(".map");
                write(Path::new(&map), br#"{"version":3,"mappings":""}"#)?;
            }
            Ok(())
        })
    }
}

/// A toolchain backed by fresh fakes.
pub fn fake_toolchain() -> (Toolchain, FakeCompiler, FakeBundler) {
    let compiler = FakeCompiler::new();
    let bundler = FakeBundler::new();
    let toolchain = Toolchain::new(Arc::new(compiler.clone()), Arc::new(bundler.clone()));
    (toolchain, compiler, bundler)
}
