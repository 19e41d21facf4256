//! Ephemeral static file server for prerendering.
//!
//! Serves a built single-page application over a local HTTP endpoint with
//! SPA fallback routing, for the lifetime of one generation run.

pub mod server;

pub use server::{ServerError, StaticServer};
