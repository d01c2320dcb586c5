//! Tool trait definition
//!
//! All hub tools implement this trait to provide a consistent interface
//! over the engines.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of executing a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The output of the tool
    pub output: String,
    /// Whether the tool execution resulted in an error
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful tool result
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            is_error: false,
        }
    }

    /// Create a successful tool result from a JSON value
    pub fn json(value: &Value) -> Self {
        Self {
            output: value.to_string(),
            is_error: false,
        }
    }

    /// Create an error tool result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            output: message.into(),
            is_error: true,
        }
    }
}

/// Trait for tools exposed by the hub
///
/// Tools are thin adapters: argument extraction, one engine call, and a
/// printable result. Policy lives in the engines.
#[async_trait]
pub trait HubTool: Send + Sync {
    /// Get the name of this tool
    fn name(&self) -> &str;

    /// Get a description of this tool
    fn description(&self) -> &str;

    /// Execute the tool with the given arguments
    async fn execute(&self, args: &Value) -> Result<ToolResult>;
}

/// Extract a required string argument
pub fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("Missing '{}' argument", key))
}

/// Extract an optional string argument
pub fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

/// Extract an optional boolean argument
pub fn optional_bool(args: &Value, key: &str) -> Option<bool> {
    args.get(key).and_then(Value::as_bool)
}

/// Extract an optional integer argument
pub fn optional_i64(args: &Value, key: &str) -> Option<i64> {
    args.get(key).and_then(Value::as_i64)
}

/// Extract an optional string-array argument
pub fn optional_str_vec(args: &Value, key: &str) -> Vec<String> {
    args.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_result_success() {
        let result = ToolResult::success("output");
        assert_eq!(result.output, "output");
        assert!(!result.is_error);
    }

    #[test]
    fn test_tool_result_error() {
        let result = ToolResult::error("error message");
        assert_eq!(result.output, "error message");
        assert!(result.is_error);
    }

    #[test]
    fn test_arg_helpers() {
        let args = json!({
            "path": "/data/x",
            "read_only": true,
            "limit": 5,
            "tags": ["a", "b"],
        });
        assert_eq!(required_str(&args, "path").unwrap(), "/data/x");
        assert!(required_str(&args, "missing").is_err());
        assert_eq!(optional_bool(&args, "read_only"), Some(true));
        assert_eq!(optional_i64(&args, "limit"), Some(5));
        assert_eq!(optional_str_vec(&args, "tags"), vec!["a", "b"]);
        assert!(optional_str_vec(&args, "missing").is_empty());
    }
}
