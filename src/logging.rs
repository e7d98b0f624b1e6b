// src/logging.rs

//! Logging setup for `devpipe` using `tracing` + `tracing-subscriber`.
//!
//! The filter is chosen from, in order:
//! 1. `--log-level` (applies to devpipe and request tracing)
//! 2. `DEVPIPE_LOG`, a full `EnvFilter` directive string such as
//!    `"devpipe=debug,tower_http=info"`
//! 3. `info`
//!
//! Logs go to STDERR; stdout is reserved for `--dry-run` output.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

const ENV_VAR: &str = "DEVPIPE_LOG";

/// Crates whose chatter stays at `warn` unless named explicitly.
const QUIET: &[&str] = &["hyper", "hyper_util", "notify", "mio"];

/// Initialise the global logging subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(level) => filter_for(level.as_str()),
        None => match std::env::var(ENV_VAR) {
            Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(&directives)
                .with_context(|| format!("invalid {ENV_VAR} value '{directives}'"))?,
            _ => filter_for("info"),
        },
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("logging already initialised: {e}"))
}

/// A filter at `level` with the noisy dependencies capped at `warn`.
fn filter_for(level: &str) -> EnvFilter {
    QUIET
        .iter()
        .fold(EnvFilter::new(level), |filter, krate| match format!("{krate}=warn").parse() {
            Ok(directive) => filter.add_directive(directive),
            Err(_) => filter,
        })
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}
