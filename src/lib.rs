//! Svcgraph Server: HTTP server for service dependency graphs.
//!
//! The core (store, graph assembly, watermarks, metrics) lives in
//! `svcgraph-service`; the REST adapter lives in `svcgraph-http`. This crate
//! adds configuration and the binary entry point.

pub mod config;

pub use svcgraph_http::{AppState, router, serve};
