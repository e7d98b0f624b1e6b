// src/serve/mod.rs

//! Static file server with live reload.
//!
//! - [`ReloadHub`] fans reload signals out to connected browsers.
//! - [`start`] serves a directory over HTTP, injects the reload client into
//!   HTML responses and exposes the Server-Sent Events endpoint.

pub mod hub;
pub mod server;

pub use hub::{HubMessage, ReloadHub};
pub use server::{start, ServeOptions, ServerHandle, EVENTS_PATH, RELOAD_SCRIPT_PATH};
