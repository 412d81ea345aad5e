//! Tools the LLM may call.
//!
//! - [`registry`]: ToolDescriptor, ToolRegistry (the advertised catalog)
//! - [`flight`]: Flight-search API client and the `search_flights` tool
//! - [`dispatch`]: Routes a ToolCallRequest to its handler, never failing

pub mod dispatch;
pub mod flight;
pub mod registry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RelayError;
use registry::ToolDescriptor;

/// A callable tool: its advertised descriptor plus the handler behind it.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn descriptor(&self) -> ToolDescriptor;

    /// Run the tool with already-decoded arguments.
    async fn invoke(&self, arguments: Value) -> Result<Value, RelayError>;
}

/// Outcome of a tool call, always returned as data.
///
/// Success serializes as the raw tool output; failure as `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResult {
    Error { error: String },
    Content(Value),
}

impl ToolResult {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// JSON text of the result, as fed back to the LLM or stored in history.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
