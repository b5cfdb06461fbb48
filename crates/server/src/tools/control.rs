//! sw_message and cache_status tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheWorker, ControlReply};

use crate::tools::json_result;

/// Parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Control message, e.g. `{"action": "CLEAR_CACHE"}` or
    /// `{"action": "REVALIDATE_ALL"}`.
    pub message: serde_json::Value,
}

/// Output from the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageOutput {
    /// Reply from the worker. Absent when the message was not recognized.
    pub reply: Option<ControlReply>,
}

/// Implementation of the sw_message tool.
pub async fn message_impl(worker: &CacheWorker, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let reply = worker.post_message(&params.message).await?;
    Ok(json_result(&SwMessageOutput { reply })?)
}

/// Implementation of the cache_status tool.
pub async fn status_impl(worker: &CacheWorker) -> Result<CallToolResult, McpError> {
    let status = worker.status().await?;
    Ok(json_result(&status)?)
}
