//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the edge tier, the control channel and the
//! in-page resource manager.
use std::sync::Arc;

use crate::deck::ConfiguredDeck;
use crate::edge::{ControlHandle, EdgeCacheService};
use crate::tools::{
    ResourceFetchParams, ResourceLoadParams, SlideNavigateParams, cache, fetch_impl, load_impl, navigate_impl,
    stats_impl,
};
use slidecache_client::ResourceManager;

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

/// The main MCP server handler for slidecache.
#[derive(Clone)]
pub struct SlideCacheServer {
    edge: EdgeCacheService,
    control: ControlHandle,
    manager: Arc<ResourceManager>,
    deck: Arc<ConfiguredDeck>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl SlideCacheServer {
    pub fn new(
        edge: EdgeCacheService, control: ControlHandle, manager: Arc<ResourceManager>, deck: Arc<ConfiguredDeck>,
    ) -> Self {
        Self { edge, control, manager, deck, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Route one request through the edge cache. Returns status, body and where it was served from."
    )]
    async fn resource_fetch(&self, params: Parameters<ResourceFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.edge, params.0).await
    }

    #[tool(description = "Resolve a resource through the in-page memo caches (image, component or general).")]
    async fn resource_load(&self, params: Parameters<ResourceLoadParams>) -> Result<CallToolResult, McpError> {
        load_impl(&self.manager, params.0).await
    }

    #[tool(description = "Record navigation to a slide and preload its neighbours in the background.")]
    async fn slide_navigate(&self, params: Parameters<SlideNavigateParams>) -> Result<CallToolResult, McpError> {
        navigate_impl(&self.manager, &self.deck, params.0).await
    }

    #[tool(description = "In-page cache sizes, preload queue and last memory sample.")]
    async fn resource_stats(&self) -> Result<CallToolResult, McpError> {
        stats_impl(&self.manager).await
    }

    #[tool(description = "List every open cache store with its entry count.")]
    async fn cache_info(&self) -> Result<CallToolResult, McpError> {
        cache::info_impl(&self.control).await
    }

    #[tool(description = "Delete every cache store regardless of generation.")]
    async fn cache_clear(&self) -> Result<CallToolResult, McpError> {
        cache::clear_impl(&self.control).await
    }

    #[tool(description = "Promote the waiting cache generation to active immediately.")]
    async fn version_adopt(&self) -> Result<CallToolResult, McpError> {
        cache::adopt_impl(&self.control).await
    }
}

impl ServerHandler for SlideCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "slidecache".into(),
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
