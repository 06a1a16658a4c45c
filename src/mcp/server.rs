//! MCP server: tool router and resource handlers over a shared database.

use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, tool::ToolCallContext, wrapper::Parameters},
    model::*,
    service::RequestContext,
    tool, tool_router,
};
use tracing::debug;

use super::resources::{read_resource, resource_list};
use super::tools::{
    self, IdParams, ListDependenciesParams, ListServersParams, ListServicesParams, SearchParams,
    tool_result,
};
use crate::db::Database;

const INSTRUCTIONS: &str = "svcmap inventory: servers, the services they host and the \
dependencies between services. All tools are read-only.";

/// MCP server over the inventory.
///
/// Generic over `D: Database`; one instance is built per request by the
/// streamable HTTP service, sharing the database through an `Arc`.
pub struct McpServer<D: Database> {
    db: Arc<D>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl<D: Database + 'static> McpServer<D> {
    pub fn new(db: Arc<D>) -> Self {
        Self {
            db,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "List servers with optional search and hoster filter.")]
    pub async fn list_servers(
        &self,
        params: Parameters<ListServersParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(tool_result(tools::list_servers(self.db.as_ref(), params.0).await))
    }

    #[tool(description = "Get a server with its services and child servers.")]
    pub async fn get_server(
        &self,
        params: Parameters<IdParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(tool_result(tools::get_server(self.db.as_ref(), params.0).await))
    }

    #[tool(
        description = "List services, optionally those on one server or matching a search."
    )]
    pub async fn list_services(
        &self,
        params: Parameters<ListServicesParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(tool_result(tools::list_services(self.db.as_ref(), params.0).await))
    }

    #[tool(description = "Get a service with the services it depends on and its dependents.")]
    pub async fn get_service(
        &self,
        params: Parameters<IdParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(tool_result(tools::get_service(self.db.as_ref(), params.0).await))
    }

    #[tool(description = "List service dependency edges.")]
    pub async fn list_dependencies(
        &self,
        params: Parameters<ListDependenciesParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(tool_result(
            tools::list_dependencies(self.db.as_ref(), params.0).await,
        ))
    }

    #[tool(description = "Get the full server/service dependency graph as nodes and edges.")]
    pub async fn get_dependency_graph(&self) -> Result<CallToolResult, McpError> {
        Ok(tool_result(tools::dependency_graph(self.db.as_ref()).await))
    }

    #[tool(description = "Inventory counts, edge counts per type and recent maintenance.")]
    pub async fn get_dashboard_stats(&self) -> Result<CallToolResult, McpError> {
        Ok(tool_result(tools::dashboard_stats(self.db.as_ref()).await))
    }

    #[tool(description = "Search servers and services by name and other text fields.")]
    pub async fn search_inventory(
        &self,
        params: Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(tool_result(
            tools::search_inventory(self.db.as_ref(), params.0).await,
        ))
    }
}

impl<D: Database + 'static> ServerHandler for McpServer<D> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(
            ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .build(),
        )
        .with_protocol_version(ProtocolVersion::V_2024_11_05)
        .with_server_info(Implementation::new("svcmap", env!("CARGO_PKG_VERSION")))
        .with_instructions(INSTRUCTIONS)
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tool_router.list_all()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        debug!(tool = %request.name, "MCP tool call");
        let tool_context = ToolCallContext::new(self, request, context);
        self.tool_router.call(tool_context).await
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult::with_all_items(resource_list()))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        read_resource(self.db.as_ref(), &request.uri).await
    }
}
