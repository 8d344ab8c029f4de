//! Structured errors raised by the tool layer itself.
//!
//! Worker and store failures arrive as `swcache_core::Error` and convert on
//! their own; these cover bad tool arguments and output encoding.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid tool arguments (e.g., an empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Tool output could not be encoded as JSON.
    #[error("OUTPUT_FAILED: {0}")]
    OutputFailed(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::OutputFailed(msg) => (-32603, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_code() {
        let err: McpError = ToolError::InvalidInput("url must not be empty".into()).into();
        assert_eq!(err.code.0, -32602);
        assert_eq!(err.message, "url must not be empty");
    }

    #[test]
    fn test_display_prefix() {
        assert!(ToolError::OutputFailed("x".into()).to_string().starts_with("OUTPUT_FAILED"));
    }
}
