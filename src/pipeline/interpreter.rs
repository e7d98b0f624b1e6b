// src/pipeline/interpreter.rs

//! Generic `Step` interpreter.
//!
//! The interpreter only knows about composition. What a primitive *does*
//! is up to the [`PrimitiveRunner`], which keeps the composition rules
//! testable with a recording fake.

use std::sync::Arc;

use anyhow::anyhow;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::errors::{DevpipeError, Result};
use crate::pipeline::step::{Primitive, Step};
use crate::pipeline::TaskFuture;

/// Gives primitives their meaning and resolves pipeline references.
pub trait PrimitiveRunner: Send + Sync + 'static {
    fn run_primitive(self: Arc<Self>, primitive: Primitive) -> TaskFuture;

    /// Look up a named pipeline. `None` means the name is unknown.
    fn resolve(&self, name: &str) -> Option<Step>;
}

/// Run `step` to completion with `runner`.
///
/// Dropping the returned future drops every step still in flight,
/// including members of a `Parallel` group.
pub fn interpret<R: PrimitiveRunner>(runner: Arc<R>, step: Step) -> TaskFuture {
    Box::pin(async move {
        match step {
            Step::Run(primitive) => {
                debug!(task = %primitive, "running primitive");
                runner.run_primitive(primitive).await
            }
            Step::Pipeline(name) => {
                let resolved = runner.resolve(&name).ok_or_else(|| {
                    DevpipeError::ConfigError(format!("unknown pipeline '{name}'"))
                })?;
                debug!(pipeline = %name, "entering pipeline");
                interpret(runner, resolved).await
            }
            Step::Sequence(steps) => {
                for step in steps {
                    interpret(Arc::clone(&runner), step).await?;
                }
                Ok(())
            }
            Step::Parallel(steps) => run_parallel(runner, steps).await,
        }
    })
}

async fn run_parallel<R: PrimitiveRunner>(runner: Arc<R>, steps: Vec<Step>) -> Result<()> {
    let mut set = JoinSet::new();
    for step in steps {
        set.spawn(interpret(Arc::clone(&runner), step));
    }

    // Wait for every member; keep the first error observed.
    let mut first_err: Option<DevpipeError> = None;
    while let Some(joined) = set.join_next().await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(join_err) => Err(DevpipeError::Other(anyhow!(
                "parallel step aborted: {join_err}"
            ))),
        };

        if let Err(err) = outcome {
            if first_err.is_none() {
                first_err = Some(err);
            } else {
                error!(error = %err, "additional failure in parallel group");
            }
        }
    }

    match first_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
