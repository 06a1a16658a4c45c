//! MCP Streamable HTTP service creation

use std::sync::Arc;

use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};

use super::server::McpServer;
use crate::db::Database;

/// Create the MCP service mounted at `/mcp`.
///
/// Stateless: every `POST` carries one JSON-RPC message and gets a plain
/// `application/json` answer (202 for notifications). There is no session
/// header, no SSE stream and no `GET`/`DELETE`.
pub fn create_mcp_service<D: Database + 'static>(
    db: Arc<D>,
) -> StreamableHttpService<McpServer<D>, LocalSessionManager> {
    let service_factory = move || -> Result<McpServer<D>, std::io::Error> {
        Ok(McpServer::new(Arc::clone(&db)))
    };

    let config = StreamableHttpServerConfig::default()
        .with_stateful_mode(false)
        .with_json_response(true)
        .with_sse_keep_alive(None);

    StreamableHttpService::new(
        service_factory,
        LocalSessionManager::default().into(),
        config,
    )
}
