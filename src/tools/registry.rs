//! Tool registry
//!
//! Holds all tools exposed by the hub and dispatches typed requests to
//! them. The outer transport (how a request arrives) is not the registry's
//! concern; it only maps `{tool_name, args}` to `{ok, result | error}`.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::tool::{HubTool, ToolResult};

/// A typed tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    pub tool_name: String,
    #[serde(default)]
    pub args: Value,
}

/// A typed tool response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResponse {
    fn success(result: String) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Registry that holds all available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn HubTool>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool
    pub fn register<T: HubTool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        tracing::debug!("[ToolRegistry] Registering tool: {}", name);
        self.tools.insert(name, Arc::new(tool));
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn HubTool>> {
        self.tools.get(name).cloned()
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, args: &Value) -> ToolResult {
        let tool = match self.tools.get(name) {
            Some(tool) => tool,
            None => return ToolResult::error(format!("Tool not found: {}", name)),
        };

        tracing::info!("[ToolRegistry] Executing tool: {}", name);
        match tool.execute(args).await {
            Ok(result) => result,
            Err(e) => ToolResult::error(e.to_string()),
        }
    }

    /// Dispatch a typed request to a typed response
    pub async fn dispatch(&self, request: &ToolRequest) -> ToolResponse {
        let result = self.execute(&request.tool_name, &request.args).await;
        if result.is_error {
            ToolResponse::failure(result.output)
        } else {
            ToolResponse::success(result.output)
        }
    }

    /// Sorted list of tool names
    pub fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl HubTool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the 'text' argument"
        }

        async fn execute(&self, args: &Value) -> Result<ToolResult> {
            match args.get("text").and_then(Value::as_str) {
                Some(text) => Ok(ToolResult::success(text)),
                None => Ok(ToolResult::error("Missing 'text' argument")),
            }
        }
    }

    #[test]
    fn test_empty_registry() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.get("nonexistent").is_none());
    }

    #[tokio::test]
    async fn test_execute_registered_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        let result = registry.execute("echo", &json!({"text": "hi"})).await;
        assert!(!result.is_error);
        assert_eq!(result.output, "hi");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_failure_response() {
        let registry = ToolRegistry::new();
        let response = registry
            .dispatch(&ToolRequest {
                tool_name: "missing".into(),
                args: json!({}),
            })
            .await;
        assert!(!response.ok);
        assert!(response.error.unwrap().contains("Tool not found"));
    }

    #[tokio::test]
    async fn test_dispatch_maps_errors() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        let good = registry
            .dispatch(&ToolRequest {
                tool_name: "echo".into(),
                args: json!({"text": "ok"}),
            })
            .await;
        assert!(good.ok);
        assert_eq!(good.result.as_deref(), Some("ok"));

        let bad = registry
            .dispatch(&ToolRequest {
                tool_name: "echo".into(),
                args: json!({}),
            })
            .await;
        assert!(!bad.ok);
        assert!(bad.error.is_some());
    }

    #[test]
    fn test_tool_names_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        assert_eq!(registry.tool_names(), vec!["echo"]);
    }
}
