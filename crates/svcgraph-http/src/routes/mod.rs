//! HTTP API route handlers.

pub mod graph;
pub mod relations;
pub mod services;
pub mod system;
