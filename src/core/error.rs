//! Hub error types

use thiserror::Error;

/// Errors that can occur in the hub
#[derive(Error, Debug)]
pub enum HubError {
    /// Permission request id is unknown
    #[error("Request not found: {0}")]
    RequestNotFound(String),

    /// Permission grant id is unknown
    #[error("Permission not found: {0}")]
    PermissionNotFound(String),

    /// Access denied by policy
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Gateway is not running
    #[error("Gateway not running")]
    GatewayNotRunning,

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    ChannelClosed,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Tool execution error
    #[error("Tool error: {0}")]
    ToolError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl HubError {
    /// Create a generic error from a string
    pub fn other(msg: impl Into<String>) -> Self {
        HubError::Other(msg.into())
    }

    /// Create a tool error
    pub fn tool_error(msg: impl Into<String>) -> Self {
        HubError::ToolError(msg.into())
    }
}

/// Result type alias for hub operations
pub type HubResult<T> = Result<T, HubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HubError::RequestNotFound("abc123".into());
        assert_eq!(err.to_string(), "Request not found: abc123");

        let err = HubError::ChannelClosed;
        assert_eq!(err.to_string(), "Channel closed");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let hub_err: HubError = io_err.into();
        assert!(matches!(hub_err, HubError::Io(_)));
    }
}
