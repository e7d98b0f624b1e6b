// src/tools/process.rs

//! Child process runner for external tools.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::debug;

/// Captured result of a finished tool process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Stdout followed by stderr, trimmed; what a user would have seen.
    pub fn combined(&self) -> String {
        let mut text = String::new();
        for part in [self.stdout.trim_end(), self.stderr.trim_end()] {
            if part.is_empty() {
                continue;
            }
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(part);
        }
        text
    }
}

/// Run `program args...` in `cwd` to completion and capture its output.
///
/// The child is killed if the returned future is dropped, so cancelling a
/// watch run does not leave a compiler behind.
pub async fn run_process(program: &str, args: &[String], cwd: &Path) -> Result<ProcessOutput> {
    // `npx` and friends are batch scripts on Windows.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(program);
        c
    } else {
        Command::new(program)
    };

    cmd.args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(program, ?args, cwd = %cwd.display(), "spawning tool process");

    let output = cmd
        .output()
        .await
        .with_context(|| format!("running '{program}' in {}", cwd.display()))?;

    let result = ProcessOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    debug!(
        program,
        exit_code = result.code.unwrap_or(-1),
        success = result.success,
        "tool process exited"
    );

    Ok(result)
}
