// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod serve;
pub mod tasks;
pub mod tools;
pub mod types;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, ProjectConfig, DEFAULT_CONFIG_FILE};
use crate::fs::RealFileSystem;
use crate::pipeline::{Executor, PipelineSet};
use crate::tools::Toolchain;
use crate::types::BuildMode;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and validation
/// - the named pipelines
/// - the executor with process-backed tools
/// - Ctrl-C handling
///
/// Errors before the `dev` pipeline has armed its watches and started the
/// server are returned (exit code 1). After that, failures are logged by
/// the watches and the process keeps running until Ctrl-C.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let required = args.config != DEFAULT_CONFIG_FILE;
    let mode = BuildMode::from_env();

    let config = Arc::new(load_and_validate(&config_path, required, mode)?);

    let pipelines = PipelineSet::standard(&config);
    pipelines.validate(&config)?;
    let pipelines = Arc::new(pipelines);

    let target = args.task.pipeline_name();

    if args.dry_run {
        print_dry_run(&config, &pipelines, target);
        return Ok(());
    }

    info!(
        mode = %config.mode(),
        root = %config.root().display(),
        pipeline = %target,
        "devpipe starting"
    );

    let toolchain = Toolchain::from_config(&config);
    let executor = Executor::new(
        Arc::clone(&config),
        pipelines,
        Arc::new(RealFileSystem),
        toolchain,
    );

    if let Err(err) = executor.run_pipeline(target).await {
        executor.shutdown().await;
        return Err(err.into());
    }

    if let Some(addr) = executor.server_addr() {
        info!(url = %format!("http://{addr}"), "watching for changes; press Ctrl-C to stop");
    }

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    executor.shutdown().await;
    Ok(())
}

/// Print the resolved configuration and pipelines.
fn print_dry_run(config: &ProjectConfig, pipelines: &PipelineSet, target: &str) {
    println!("devpipe dry-run");
    println!("  mode = {}", config.mode());
    println!("  root = {}", config.root().display());
    println!("  tsconfig = {}", config.tsconfig().display());
    println!("  out = {}", config.out().display());
    println!("  dist = {}", config.dist().display());
    println!(
        "  package = {} {}",
        config.package().name,
        config.package().version
    );
    println!();

    println!("path-sets ({}):", config.path_sets().len());
    for set in config.path_sets() {
        println!("  - {} ({})", set.name(), set.kind());
        println!("      patterns: {:?}", set.matcher().patterns().collect::<Vec<_>>());
        if let Some(dest) = set.dest() {
            println!("      dest: {}", dest.display());
        }
        println!("      debounce: {:?}", set.debounce());
        if set.use_hash() {
            println!("      use_hash: true");
        }
    }
    println!();

    let compile = config.compile();
    println!("compile: {} {}", compile.program, compile.args.join(" "));
    let bundle = config.bundle();
    println!(
        "bundle: {} -> {} (global {}, target {}, minify {})",
        bundle.entry.display(),
        bundle.outfile.display(),
        bundle.global_name,
        bundle.target,
        config.mode().minify()
    );
    let serve = config.serve();
    println!("serve: http://{}:{} ({})", serve.host, serve.port, serve.index);
    println!();

    println!("pipelines ({}):", pipelines.len());
    for (name, step) in pipelines.iter() {
        let marker = if name == target { " *" } else { "" };
        println!("  {name}{marker} = {step}");
    }

    debug!("dry-run complete (no execution)");
}
