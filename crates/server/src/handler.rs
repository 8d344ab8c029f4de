//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{
    CacheDeleteParams, CacheKeysParams, CacheMatchParams, SwFetchParams, SwMessageParams, cache, fetch::fetch_impl,
    message::message_impl, worker,
};

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
use swcache_client::OfflineWorker;

/// The main MCP server handler for swcache.
#[derive(Clone)]
pub struct SwCacheServer {
    worker: Arc<OfflineWorker>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl SwCacheServer {
    /// Create a new server handler around a worker.
    pub fn new(worker: Arc<OfflineWorker>) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Deliver a request to the offline worker as a fetch event. Returns the strategy used and the response the page would receive, or why the request was passed through."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Post a control message (SKIP_WAITING, CLEAR_CACHE, CACHE_CURRENT_PAGE) to the worker.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.worker, params.0).await
    }

    #[tool(description = "Report the worker's lifecycle state, whether it controls fetches, and its store names.")]
    async fn sw_state(&self) -> Result<CallToolResult, McpError> {
        worker::state_impl(&self.worker)
    }

    #[tool(
        description = "Check for a worker update. Reports up-to-date when the active install matches the current version; otherwise re-runs install and activation."
    )]
    async fn sw_update(&self) -> Result<CallToolResult, McpError> {
        worker::update_impl(&self.worker).await
    }

    #[tool(description = "List cache stores with entry counts, or the entries of one store.")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        cache::keys_impl(&self.worker, params.0).await
    }

    #[tool(description = "Look up a stored response by URL and method, in one store or across all stores.")]
    async fn cache_match(&self, params: Parameters<CacheMatchParams>) -> Result<CallToolResult, McpError> {
        cache::match_impl(&self.worker, params.0).await
    }

    #[tool(description = "Delete a stored response by URL and method, from one store or from every store.")]
    async fn cache_delete(&self, params: Parameters<CacheDeleteParams>) -> Result<CallToolResult, McpError> {
        cache::delete_impl(&self.worker, params.0).await
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{ScriptedNetwork, worker};

    #[tokio::test]
    async fn test_lists_every_tool() {
        let server = SwCacheServer::new(worker(ScriptedNetwork::new()).await);
        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["cache_delete", "cache_keys", "cache_match", "sw_fetch", "sw_message", "sw_state", "sw_update"]);
    }

    #[tokio::test]
    async fn test_server_info() {
        let server = SwCacheServer::new(worker(ScriptedNetwork::new()).await);
        assert_eq!(server.get_info().server_info.name, "swcache");
    }
}
