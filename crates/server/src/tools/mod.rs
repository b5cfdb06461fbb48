//! MCP tool implementations.
//!
//! This module contains all tools exposed by the swcache server.

pub mod control;
pub mod fetch;

pub use control::{SwMessageParams, message_impl, status_impl};
pub use fetch::{SwFetchParams, fetch_impl};

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

use crate::error::ToolError;

/// Render a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, ToolError> {
    let json = serde_json::to_string_pretty(output).map_err(|e| ToolError::Serialization(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
