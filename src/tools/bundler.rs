// src/tools/bundler.rs

use tracing::{error, info};

use crate::config::BundleSettings;
use crate::errors::DevpipeError;
use crate::tools::process::run_process;
use crate::tools::{BundleRequest, Bundler, ToolFuture};

/// Runs esbuild as configured in `[bundle]`.
#[derive(Debug, Clone)]
pub struct EsbuildBundler {
    settings: BundleSettings,
}

impl EsbuildBundler {
    pub fn new(settings: BundleSettings) -> Self {
        Self { settings }
    }
}

/// Command-line arguments for one esbuild invocation.
///
/// Produces an IIFE exposing `global_name`, with the banner as the first
/// thing in the output file.
pub fn esbuild_args(base: &[String], request: &BundleRequest) -> Vec<String> {
    let mut args: Vec<String> = base.to_vec();
    args.push(request.entry.display().to_string());
    args.push("--bundle".to_string());
    args.push("--format=iife".to_string());
    args.push(format!("--global-name={}", request.global_name));
    args.push(format!("--target={}", request.target));
    if request.sourcemap {
        args.push("--sourcemap".to_string());
    }
    if request.minify {
        args.push("--minify".to_string());
    }
    args.push(format!("--banner:js={}", request.banner));
    args.push(format!("--outfile={}", request.outfile.display()));
    args
}

impl Bundler for EsbuildBundler {
    fn bundle(&self, request: BundleRequest) -> ToolFuture {
        let settings = self.settings.clone();
        Box::pin(async move {
            let args = esbuild_args(&settings.args, &request);
            let output = run_process(&settings.program, &args, &request.root).await?;

            if !output.success {
                error!(exit_code = output.code.unwrap_or(-1), "bundling failed");
                return Err(DevpipeError::BundleError(output.combined()));
            }

            info!(
                outfile = %request.outfile.display(),
                minify = request.minify,
                "bundled"
            );
            Ok(())
        })
    }
}
