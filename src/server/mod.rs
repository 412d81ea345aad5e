//! HTTP server for the web client.
//!
//! - [`api`]: Routes, request types and handlers
//! - [`streaming`]: SSE framing of relay events
//! - [`metrics`]: Prometheus counters

pub mod api;
pub mod metrics;
pub mod streaming;
