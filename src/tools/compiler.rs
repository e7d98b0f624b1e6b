// src/tools/compiler.rs

use std::sync::LazyLock;

use regex::Regex;
use tracing::{error, info};

use crate::config::CompileSettings;
use crate::errors::DevpipeError;
use crate::tools::process::run_process;
use crate::tools::{CompileRequest, Compiler, ToolFuture};

static DIAGNOSTIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"error TS\d+").expect("diagnostic regex is valid"));

/// Number of `error TSxxxx` diagnostics in compiler output.
pub fn count_diagnostics(output: &str) -> usize {
    DIAGNOSTIC.find_iter(output).count()
}

/// Runs the TypeScript compiler as configured in `[compile]`.
#[derive(Debug, Clone)]
pub struct TscCompiler {
    settings: CompileSettings,
}

impl TscCompiler {
    pub fn new(settings: CompileSettings) -> Self {
        Self { settings }
    }
}

impl Compiler for TscCompiler {
    fn compile(&self, request: CompileRequest) -> ToolFuture {
        let settings = self.settings.clone();
        Box::pin(async move {
            let output = run_process(&settings.program, &settings.args, &request.root).await?;

            if !output.success {
                let text = output.combined();
                error!(
                    diagnostics = count_diagnostics(&text),
                    exit_code = output.code.unwrap_or(-1),
                    "compilation failed"
                );
                return Err(DevpipeError::CompileError(text));
            }

            info!(
                sources = request.sources.len(),
                out = %request.out_dir.display(),
                "compiled"
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_tsc_diagnostics() {
        let output = "src/a.ts(1,7): error TS2322: Type 'string' is not assignable.\n\
                      src/b.ts(3,1): error TS1005: ';' expected.\n\
                      Found 2 errors.";
        assert_eq!(count_diagnostics(output), 2);
        assert_eq!(count_diagnostics("all good"), 0);
    }
}
