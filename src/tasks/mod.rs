// src/tasks/mod.rs

//! Filesystem-only tasks: cleaning output directories and copying static
//! assets. Both are synchronous; the executor runs them on the blocking pool.

pub mod clean;
pub mod copy;

pub use clean::{clean, reset};
pub use copy::{copy_matching, copy_path_set};
