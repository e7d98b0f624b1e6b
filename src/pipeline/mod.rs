// src/pipeline/mod.rs

//! Task pipelines as data.
//!
//! - [`step`] defines the [`Step`] tree (`Run` / `Sequence` / `Parallel` /
//!   `Pipeline`) and the [`Primitive`] tasks it bottoms out in.
//! - [`definitions`] builds the named pipelines (`build`, `dev`, ...) and
//!   validates references between them.
//! - [`interpreter`] is the single generic runner for any `Step`.
//! - [`executor`] gives the primitives their meaning (clean, copy, compile,
//!   bundle, watch, serve, reload) and owns the long-lived dev session.

use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;

/// Boxed, owned unit of work returning a completion signal.
pub type TaskFuture = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

pub mod definitions;
pub mod executor;
pub mod interpreter;
pub mod step;

pub use definitions::{PipelineSet, BUILD, COMPILE, DEV, REBUILD};
pub use executor::Executor;
pub use interpreter::{interpret, PrimitiveRunner};
pub use step::{Primitive, Step};
