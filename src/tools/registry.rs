//! The tool catalog advertised to the LLM.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ToolHandler;

/// Name, description and JSON-Schema parameters of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Chat-completions wire form: `{"type": "function", "function": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ToolDescriptor,
}

impl From<ToolDescriptor> for ToolSpec {
    fn from(function: ToolDescriptor) -> Self {
        Self {
            kind: "function".to_string(),
            function,
        }
    }
}

/// Ordered set of tools. Built once at startup and shared read-only.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: ToolHandler + 'static>(&mut self, tool: T) {
        self.tools.push(Arc::new(tool));
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<T: ToolHandler + 'static>(mut self, tool: T) -> Self {
        self.register(tool);
        self
    }

    /// Descriptors in registration order.
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        self.list_tools().into_iter().map(ToolSpec::from).collect()
    }

    /// First handler registered under `name`.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools
            .iter()
            .find(|t| t.descriptor().name == name)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::error::RelayError;

    struct Fixed(&'static str, i64);

    #[async_trait]
    impl ToolHandler for Fixed {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor {
                name: self.0.to_string(),
                description: "fixed".to_string(),
                parameters: json!({"type": "object", "properties": {}}),
            }
        }

        async fn invoke(&self, _arguments: Value) -> Result<Value, RelayError> {
            Ok(json!(self.1))
        }
    }

    #[test]
    fn test_list_preserves_order() {
        let registry = ToolRegistry::new()
            .with(Fixed("b", 1))
            .with(Fixed("a", 2))
            .with(Fixed("c", 3));

        let names: Vec<_> = registry.list_tools().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(registry.list_tools(), registry.list_tools());
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let registry = ToolRegistry::new().with(Fixed("dup", 1)).with(Fixed("dup", 2));
        let tool = registry.get("dup").unwrap();
        assert_eq!(tool.invoke(json!({})).await.unwrap(), json!(1));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_spec_wire_shape() {
        let registry = ToolRegistry::new().with(Fixed("t", 0));
        let spec = serde_json::to_value(&registry.tool_specs()[0]).unwrap();
        assert_eq!(spec["type"], "function");
        assert_eq!(spec["function"]["name"], "t");
        assert!(spec["function"]["parameters"].is_object());
    }
}
