// src/pipeline/executor.rs

//! Meaning of each [`Primitive`] and the long-lived dev session.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Instant;

use anyhow::{anyhow, Context};
use tracing::{info, warn};

use crate::config::{PathSet, ProjectConfig};
use crate::errors::{DevpipeError, Result};
use crate::fs::FileSystem;
use crate::pipeline::definitions::{refresh_name, PipelineSet, REBUILD};
use crate::pipeline::interpreter::{interpret, PrimitiveRunner};
use crate::pipeline::step::{Primitive, Step};
use crate::pipeline::TaskFuture;
use crate::serve::{self, ReloadHub, ServeOptions, ServerHandle};
use crate::tasks;
use crate::tools::{BundleRequest, CompileRequest, Toolchain};
use crate::types::PathSetKind;
use crate::watch::{self, collect_matching_files, Trigger, WatchHandle};

/// Resources that live as long as the `dev` session.
#[derive(Debug, Default)]
struct Session {
    watches: Vec<WatchHandle>,
    server: Option<ServerHandle>,
}

/// Runs pipelines against a project.
///
/// Shared behind an `Arc`: watches re-enter it to run their pipelines.
#[derive(Debug)]
pub struct Executor {
    config: Arc<ProjectConfig>,
    pipelines: Arc<PipelineSet>,
    fs: Arc<dyn FileSystem>,
    toolchain: Toolchain,
    hub: ReloadHub,
    generation: AtomicU64,
    session: Mutex<Session>,
    this: Weak<Executor>,
}

impl Executor {
    pub fn new(
        config: Arc<ProjectConfig>,
        pipelines: Arc<PipelineSet>,
        fs: Arc<dyn FileSystem>,
        toolchain: Toolchain,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            config,
            pipelines,
            fs,
            toolchain,
            hub: ReloadHub::new(),
            generation: AtomicU64::new(0),
            session: Mutex::new(Session::default()),
            this: this.clone(),
        })
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Number of successful bundles so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn reload_hub(&self) -> &ReloadHub {
        &self.hub
    }

    /// Address of the live-reload server, once started.
    pub fn server_addr(&self) -> Option<SocketAddr> {
        self.lock_session().server.as_ref().map(|s| s.addr())
    }

    pub fn watch_count(&self) -> usize {
        self.lock_session().watches.len()
    }

    /// Run the named pipeline to completion.
    pub async fn run_pipeline(self: &Arc<Self>, name: &str) -> Result<()> {
        if !self.pipelines.contains(name) {
            return Err(DevpipeError::ConfigError(format!(
                "unknown pipeline '{name}'"
            )));
        }

        let started = Instant::now();
        info!(pipeline = %name, "starting pipeline");
        let result = interpret(Arc::clone(self), Step::pipeline(name)).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(()) => info!(pipeline = %name, elapsed_ms, "finished pipeline"),
            Err(err) => warn!(pipeline = %name, elapsed_ms, error = %err, "pipeline failed"),
        }
        result
    }

    /// Cancel every watch and stop the server.
    pub async fn shutdown(&self) {
        let (watches, server) = {
            let mut session = self.lock_session();
            (
                std::mem::take(&mut session.watches),
                session.server.take(),
            )
        };

        for watch in watches {
            watch.shutdown().await;
        }
        if let Some(server) = server {
            server.shutdown().await;
        }
        info!("session shut down");
    }

    fn lock_session(&self) -> MutexGuard<'_, Session> {
        // A panic while holding the lock leaves the session usable.
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn execute(self: Arc<Self>, primitive: Primitive) -> Result<()> {
        let started = Instant::now();
        info!(task = %primitive, "starting");

        match &primitive {
            Primitive::Clean(dir) => self.clean(dir.clone()).await?,
            Primitive::CopyStatic(set) => self.copy_static(set).await?,
            Primitive::Compile => self.compile().await?,
            Primitive::Bundle => self.bundle().await?,
            Primitive::ArmWatches => self.arm_watches()?,
            Primitive::StartServer => self.start_server().await?,
            Primitive::Reload => self.reload(),
        }

        info!(
            task = %primitive,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "finished"
        );
        Ok(())
    }

    async fn clean(&self, dir: std::path::PathBuf) -> Result<()> {
        let fs = Arc::clone(&self.fs);
        blocking(move || tasks::reset(fs.as_ref(), &dir)).await
    }

    async fn copy_static(&self, name: &str) -> Result<()> {
        let set = self.static_set(name)?.clone();
        let fs = Arc::clone(&self.fs);
        let root = self.config.root().to_path_buf();
        blocking(move || tasks::copy_path_set(fs.as_ref(), &root, &set).map(|_| ())).await
    }

    async fn compile(&self) -> Result<()> {
        let source = self.config.source_set().matcher().clone();
        let fs = Arc::clone(&self.fs);
        let root = self.config.root().to_path_buf();
        let sources = blocking(move || {
            collect_matching_files(fs.as_ref(), &root, &source)
                .map_err(|e| DevpipeError::io(&root, e))
        })
        .await?;

        if sources.is_empty() {
            info!(
                path_set = %self.config.source_set().name(),
                "no source files; nothing to compile"
            );
            return Ok(());
        }

        let request = CompileRequest {
            root: self.config.root().to_path_buf(),
            tsconfig: self.config.tsconfig().to_path_buf(),
            out_dir: self.config.out().to_path_buf(),
            sources,
        };
        self.toolchain.compiler.compile(request).await
    }

    async fn bundle(&self) -> Result<()> {
        let settings = self.config.bundle();
        if !self.fs.is_file(&settings.entry) {
            info!(
                entry = %settings.entry.display(),
                "compiled entry missing; nothing to bundle"
            );
            return Ok(());
        }

        let request = BundleRequest {
            root: self.config.root().to_path_buf(),
            entry: settings.entry.clone(),
            outfile: settings.outfile.clone(),
            global_name: settings.global_name.clone(),
            banner: self.config.package().banner(),
            target: settings.target.clone(),
            minify: self.config.mode().minify(),
            sourcemap: settings.sourcemap,
        };
        self.toolchain.bundler.bundle(request).await?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(generation, outfile = %settings.outfile.display(), "build generation complete");
        Ok(())
    }

    fn arm_watches(&self) -> Result<()> {
        if !self.lock_session().watches.is_empty() {
            warn!("watches already armed; ignoring");
            return Ok(());
        }

        let mut armed = Vec::new();
        for set in self.config.path_sets() {
            let pipeline = match set.kind() {
                PathSetKind::Source => REBUILD.to_string(),
                PathSetKind::Static => refresh_name(set.name()),
            };
            let trigger = self.trigger_for(pipeline);
            let handle = watch::arm(self.config.root(), set, Arc::clone(&self.fs), trigger)
                .map_err(|e| {
                    DevpipeError::Other(e.context(format!("arming watch for '{}'", set.name())))
                })?;
            armed.push(handle);
        }

        info!(watches = armed.len(), "watches armed");
        self.lock_session().watches.extend(armed);
        Ok(())
    }

    /// Trigger that runs `pipeline` on this executor for as long as it lives.
    fn trigger_for(&self, pipeline: String) -> Trigger {
        let this = self.this.clone();
        Arc::new(move || -> TaskFuture {
            let this = this.clone();
            let pipeline = pipeline.clone();
            Box::pin(async move {
                match this.upgrade() {
                    Some(executor) => executor.run_pipeline(&pipeline).await,
                    None => Ok(()),
                }
            })
        })
    }

    async fn start_server(&self) -> Result<()> {
        if self.lock_session().server.is_some() {
            warn!("server already running; ignoring");
            return Ok(());
        }

        let settings = self.config.serve();
        let addr = tokio::net::lookup_host((settings.host.as_str(), settings.port))
            .await
            .with_context(|| format!("resolving {}:{}", settings.host, settings.port))?
            .next()
            .ok_or_else(|| anyhow!("no address for {}:{}", settings.host, settings.port))?;

        let options = ServeOptions {
            root: self.config.dist().to_path_buf(),
            index: settings.index.clone(),
            addr,
        };
        let handle = serve::start(options, self.hub.clone()).await?;
        self.lock_session().server = Some(handle);
        Ok(())
    }

    fn reload(&self) {
        let clients = self.hub.notify_reload();
        info!(clients, "reload requested");
    }

    fn static_set(&self, name: &str) -> Result<&PathSet> {
        match self.config.path_set(name) {
            Some(set) if set.kind() == PathSetKind::Static => Ok(set),
            _ => Err(DevpipeError::ConfigError(format!(
                "no static path-set named '{name}'"
            ))),
        }
    }
}

impl PrimitiveRunner for Executor {
    fn run_primitive(self: Arc<Self>, primitive: Primitive) -> TaskFuture {
        Box::pin(self.execute(primitive))
    }

    fn resolve(&self, name: &str) -> Option<Step> {
        self.pipelines.get(name).cloned()
    }
}

/// Run filesystem work on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| DevpipeError::Other(anyhow!("blocking task failed: {e}")))?
}
