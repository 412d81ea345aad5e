//! Chat-completions upstream.
//!
//! - [`types`]: Request/response wire types
//! - [`client`]: HTTP client with configurable deadlines
//! - [`sse`]: Line framing and parsing of the streaming response

pub mod client;
pub mod sse;
pub mod types;
