//! Structured errors for the swcache server.
//!
//! Tool-level input problems that never reach the cache engine.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid input parameters (e.g., empty method).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The request URL could not be canonicalized.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Tool output could not be encoded.
    #[error("SERIALIZATION_FAILED: {0}")]
    Serialization(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let code = match &err {
            ToolError::InvalidInput(_) => -32602,
            ToolError::InvalidUrl(_) => -32003,
            ToolError::Serialization(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
