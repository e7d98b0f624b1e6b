// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `devpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "devpipe",
    version,
    about = "Clean, compile, bundle and serve a TypeScript project with live reload.",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run. `default` and `dev` both build once, then watch and serve.
    #[arg(value_enum, default_value = "default")]
    pub task: TaskArg,

    /// Path to the config file (TOML).
    ///
    /// The file is optional: when the default path does not exist the
    /// built-in project layout is used.
    #[arg(long, value_name = "PATH", default_value = "Devpipe.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DEVPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve configuration and print pipelines, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Task names recognised on the command line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum TaskArg {
    Default,
    Dev,
}

impl TaskArg {
    /// Name of the pipeline this task resolves to.
    pub fn pipeline_name(&self) -> &'static str {
        match self {
            TaskArg::Default | TaskArg::Dev => crate::pipeline::DEV,
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
