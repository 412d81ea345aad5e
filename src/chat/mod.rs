//! Prompt handling.
//!
//! - [`orchestrator`]: Non-streaming completion with optional tool dispatch
//! - [`relay`]: Streaming completion re-emitted as StreamEvents
//! - [`event`]: StreamEvent, the SSE payload shapes
//! - [`session`]: In-memory session history and context

pub mod event;
pub mod orchestrator;
pub mod relay;
pub mod session;
