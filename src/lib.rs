//! chat-relay: LLM chat relay with tool calling.
//!
//! Sits between a web chat client and an OpenAI-compatible
//! chat-completions API:
//!   POST /api/chat        → tokens streamed back as SSE frames
//!   POST /api/chat/tools  → one-shot answer; the model may call
//!                           `search_flights`, whose result is returned
//!
//! Flight searches resolve free-form locations through an autocomplete
//! API before querying the search endpoint.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod server;
pub mod tools;
