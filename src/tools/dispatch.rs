//! Tool-call dispatch.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use super::registry::ToolRegistry;
use super::{ToolHandler, ToolResult};
use crate::error::RelayError;
use crate::llm::types::ToolCallRequest;

pub const MISSING_NAME: &str = "Function name is missing in tool call";
pub const UNKNOWN_TOOL: &str = "unknown tool";

/// Route `call` to its registered handler.
///
/// Every failure (missing or unregistered name, undecodable arguments,
/// handler error) comes back as an error result.
pub async fn dispatch(registry: &ToolRegistry, call: &ToolCallRequest) -> ToolResult {
    let (tool, arguments) = match resolve(registry, call) {
        Ok(resolved) => resolved,
        Err(e) => {
            warn!(call_id = call.id, "Rejected tool call: {e}");
            return ToolResult::error(e.to_string());
        }
    };

    let name = tool.descriptor().name;
    info!(call_id = call.id, tool = name, "Dispatching tool call");

    match tool.invoke(arguments).await {
        Ok(content) => ToolResult::Content(content),
        Err(e) => {
            warn!(call_id = call.id, tool = name, "Tool call failed: {e}");
            ToolResult::error(e.to_string())
        }
    }
}

fn resolve(
    registry: &ToolRegistry,
    call: &ToolCallRequest,
) -> Result<(Arc<dyn ToolHandler>, Value), RelayError> {
    let name = match call.function.name.as_deref() {
        Some(name) if !name.is_empty() => name,
        _ => return Err(RelayError::ToolDispatch(MISSING_NAME.to_string())),
    };

    let tool = registry
        .get(name)
        .ok_or_else(|| RelayError::ToolDispatch(UNKNOWN_TOOL.to_string()))?;

    let arguments = call
        .function
        .parsed_arguments()
        .map_err(|e| RelayError::ToolDispatch(format!("Error handling tool call: {e}")))?;

    Ok((tool, arguments))
}
