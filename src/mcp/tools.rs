//! MCP tool implementations
//!
//! Every tool is read-only. Results are pretty-printed JSON text; database
//! failures surface as `isError: true` results rather than JSON-RPC errors.

use rmcp::model::{CallToolResult, Content};
use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::api::v1::{
    DependencyResponse, ServerResponse, ServiceResponse, server_detail, service_detail,
};
use crate::db::{
    Database, DbError, DependencyQuery, DependencyRepository, Id, PageSort, ServerQuery,
    ServerRepository, ServiceQuery, ServiceRepository,
};
use crate::graph::{load_dashboard, load_graph};

pub const DEFAULT_TOOL_LIMIT: usize = 20;
pub const MAX_TOOL_LIMIT: usize = 100;

#[derive(Debug, Error)]
pub(crate) enum ToolError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("Failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

fn apply_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_TOOL_LIMIT).clamp(1, MAX_TOOL_LIMIT)
}

fn page(limit: Option<usize>, offset: Option<usize>) -> PageSort {
    PageSort {
        limit: Some(apply_limit(limit)),
        offset,
        ..Default::default()
    }
}

// Parameter types for tools
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListServersParams {
    #[schemars(description = "Case-insensitive search over server name, IP and location")]
    pub query: Option<String>,
    #[schemars(description = "Only servers at this hoster")]
    pub hoster: Option<String>,
    #[schemars(description = "Maximum number of servers to return (default: 20, max: 100)")]
    pub limit: Option<usize>,
    #[schemars(description = "Number of items to skip (for pagination)")]
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct IdParams {
    #[schemars(description = "Numeric ID")]
    pub id: Id,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListServicesParams {
    #[schemars(description = "Only services hosted on this server")]
    pub server_id: Option<Id>,
    #[schemars(description = "Case-insensitive search over service name, path and note")]
    pub query: Option<String>,
    #[schemars(description = "Maximum number of services to return (default: 20, max: 100)")]
    pub limit: Option<usize>,
    #[schemars(description = "Number of items to skip (for pagination)")]
    pub offset: Option<usize>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListDependenciesParams {
    #[schemars(description = "Only edges where this service is either end")]
    pub service_id: Option<Id>,
    #[schemars(description = "Maximum number of edges to return (default: 20, max: 100)")]
    pub limit: Option<usize>,
    #[schemars(description = "Number of items to skip (for pagination)")]
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchParams {
    #[schemars(description = "Text to look for in servers and services")]
    pub query: String,
    #[schemars(description = "Maximum results per kind (default: 20, max: 100)")]
    pub limit: Option<usize>,
}

/// Wrap a tool outcome as MCP content; failures become `isError` results.
pub(crate) fn tool_result(outcome: Result<Value, ToolError>) -> CallToolResult {
    match outcome.and_then(|value| Ok(serde_json::to_string_pretty(&value)?)) {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(e) => CallToolResult::error(vec![Content::text(e.to_string())]),
    }
}

fn encode<T: Serialize>(value: T) -> Result<Value, ToolError> {
    Ok(serde_json::to_value(value)?)
}

pub(crate) async fn get_server<D: Database>(db: &D, params: IdParams) -> Result<Value, ToolError> {
    encode(server_detail(db, params.id).await?)
}

pub(crate) async fn get_service<D: Database>(
    db: &D,
    params: IdParams,
) -> Result<Value, ToolError> {
    encode(service_detail(db, params.id).await?)
}

pub(crate) async fn dependency_graph<D: Database>(db: &D) -> Result<Value, ToolError> {
    encode(load_graph(db).await?)
}

pub(crate) async fn list_servers<D: Database>(
    db: &D,
    params: ListServersParams,
) -> Result<Value, ToolError> {
    let result = db
        .servers()
        .list(Some(&ServerQuery {
            page: page(params.limit, params.offset),
            q: params.query,
            hoster: params.hoster,
            parent_id: None,
        }))
        .await?;

    encode(serde_json::json!({
        "items": result.items.into_iter().map(ServerResponse::from).collect::<Vec<_>>(),
        "total": result.total,
    }))
}

pub(crate) async fn list_services<D: Database>(
    db: &D,
    params: ListServicesParams,
) -> Result<Value, ToolError> {
    let result = db
        .services()
        .list(Some(&ServiceQuery {
            page: page(params.limit, params.offset),
            server_id: params.server_id,
            q: params.query,
        }))
        .await?;

    encode(serde_json::json!({
        "items": result.items.into_iter().map(ServiceResponse::from).collect::<Vec<_>>(),
        "total": result.total,
    }))
}

pub(crate) async fn list_dependencies<D: Database>(
    db: &D,
    params: ListDependenciesParams,
) -> Result<Value, ToolError> {
    let result = db
        .dependencies()
        .list(Some(&DependencyQuery {
            page: page(params.limit, params.offset),
            service_id: params.service_id,
        }))
        .await?;

    encode(serde_json::json!({
        "items": result.items.into_iter().map(DependencyResponse::from).collect::<Vec<_>>(),
        "total": result.total,
    }))
}

pub(crate) async fn dashboard_stats<D: Database>(db: &D) -> Result<Value, ToolError> {
    let (summary, _) = load_dashboard(db).await?;
    encode(serde_json::json!({
        "servers": summary.servers,
        "services": summary.services,
        "dependencies": summary.dependencies,
        "hosters": summary.hosters,
        "by_type": summary.stats.by_type,
        "recent_maintenance": summary
            .recent_maintenance
            .into_iter()
            .map(ServiceResponse::from)
            .collect::<Vec<_>>(),
    }))
}

pub(crate) async fn search_inventory<D: Database>(db: &D, params: SearchParams) -> Result<Value, ToolError> {
    let limit = Some(apply_limit(params.limit));
    let servers = db
        .servers()
        .list(Some(&ServerQuery {
            page: PageSort {
                limit,
                ..Default::default()
            },
            q: Some(params.query.clone()),
            ..Default::default()
        }))
        .await?;
    let services = db
        .services()
        .list(Some(&ServiceQuery {
            page: PageSort {
                limit,
                ..Default::default()
            },
            q: Some(params.query),
            ..Default::default()
        }))
        .await?;

    encode(serde_json::json!({
        "servers": servers.items.into_iter().map(ServerResponse::from).collect::<Vec<_>>(),
        "services": services.items.into_iter().map(ServiceResponse::from).collect::<Vec<_>>(),
    }))
}
