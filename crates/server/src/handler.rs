//! MCP server handler implementation.
//!
//! This module defines the main server handler that routes tool calls to the
//! cache worker.

use std::sync::Arc;

use crate::tools::{SwFetchParams, SwMessageParams, fetch_impl, message_impl, status_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use swcache_core::CacheWorker;

/// The main MCP server handler for swcache.
#[derive(Clone)]
pub struct SwCacheServer {
    worker: Arc<CacheWorker>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl SwCacheServer {
    /// Create a new server handler around an installed worker.
    pub fn new(worker: Arc<CacheWorker>) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    /// Run a request through the worker's fetch hook.
    #[tool(
        description = "Fetch a URL through the caching worker. Cacheable requests are served by their strategy (network-first, cache-first, time-aware cache-first or stale-while-revalidate); others pass through to the origin. Returns status, body and whether the response came from the network, the cache or a passthrough."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    /// Post a control message to the worker.
    #[tool(
        description = "Post a control message to the caching worker. {\"action\": \"CLEAR_CACHE\"} deletes the current cache generation; {\"action\": \"REVALIDATE_ALL\"} marks every tracked URL stale. Unknown actions are ignored and get no reply."
    )]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.worker, params.0).await
    }

    /// Report the worker's lifecycle state and cache generation.
    #[tool(description = "Report the caching worker's lifecycle state, current cache generation and number of tracked URLs.")]
    async fn cache_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.worker).await
    }
}

impl ServerHandler for SwCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "swcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
