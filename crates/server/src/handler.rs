//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.

use std::sync::Arc;

use crate::tools::{
    FetchParams, RegisterParams, RequestParams, SessionParams, cleanup::cleanup_impl, fetch::fetch_impl,
    register::register_impl, resolve::resolve_impl, session::session_impl,
};
use appcache_client::engine::{AppCacheEngine, SessionTable};

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

/// The main MCP server handler for appcache.
#[derive(Clone)]
pub struct AppCacheServer {
    tool_router: ToolRouter<Self>,
    engine: Arc<AppCacheEngine>,
    sessions: Arc<SessionTable>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl AppCacheServer {
    /// Create a new server handler around an engine and the session table it reads.
    pub fn new(engine: Arc<AppCacheEngine>, sessions: Arc<SessionTable>) -> Self {
        Self { tool_router: Self::tool_router(), engine, sessions }
    }

    #[tool(
        description = "Register an application cache manifest for a page. Returns the version hash and whether it is new."
    )]
    async fn appcache_register(&self, params: Parameters<RegisterParams>) -> Result<CallToolResult, McpError> {
        register_impl(&self.engine, params.0).await
    }

    #[tool(description = "Open, navigate or close a browsing session. Closed sessions release their pinned version.")]
    async fn appcache_session(&self, params: Parameters<SessionParams>) -> Result<CallToolResult, McpError> {
        session_impl(&self.sessions, params.0).await
    }

    #[tool(
        description = "Decide how a request would be served: from a cache generation, via fallback, via network, or not at all."
    )]
    async fn appcache_resolve(&self, params: Parameters<RequestParams>) -> Result<CallToolResult, McpError> {
        resolve_impl(&self.engine, params.0).await
    }

    #[tool(description = "Serve a request through the engine and return the response status, type and body.")]
    async fn appcache_fetch(&self, params: Parameters<FetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.engine, params.0).await
    }

    /// Run the generation collector.
    ///
    /// Prunes pins of closed sessions and deletes generations no live session can reach.
    #[tool(description = "Delete cache generations that are superseded and not pinned by any live session.")]
    async fn appcache_cleanup(&self) -> Result<CallToolResult, McpError> {
        cleanup_impl(&self.engine).await
    }
}

impl ServerHandler for AppCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "appcache-mcp".into(),
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
