//! Server inventory handlers.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use super::{PaginatedServices, ServiceResponse, page_sort};
use crate::api::{ApiError, AppState, ErrorResponse};
use crate::db::{
    Database, DbResult, Id, Server, ServerInput, ServerQuery, ServerRepository, ServiceQuery,
    ServiceRepository,
};
use crate::serde_utils::{double_option, patch_nullable};

// =============================================================================
// DTOs (Data Transfer Objects)
// =============================================================================

/// Server response DTO
#[derive(Debug, Serialize, ToSchema)]
pub struct ServerResponse {
    #[schema(example = 1)]
    pub id: Id,
    #[schema(example = "web-01")]
    pub name: String,
    #[schema(example = "10.0.0.12")]
    pub ip: Option<String>,
    #[schema(example = "Hetzner")]
    pub hoster: Option<String>,
    #[schema(example = "Falkenstein")]
    pub location: Option<String>,
    /// Enclosing host for virtual machines
    pub parent_id: Option<Id>,
    #[schema(example = "#64748b")]
    pub color: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Server> for ServerResponse {
    fn from(s: Server) -> Self {
        Self {
            id: s.id,
            name: s.name,
            ip: s.ip,
            hoster: s.hoster,
            location: s.location,
            parent_id: s.parent_id,
            color: s.color,
            note: s.note,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

/// Server with its services and child servers
#[derive(Debug, Serialize, ToSchema)]
pub struct ServerDetailResponse {
    #[serde(flatten)]
    pub server: ServerResponse,
    pub services: Vec<ServiceResponse>,
    pub children: Vec<ServerResponse>,
}

/// Create server request DTO
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateServerRequest {
    #[schema(example = "web-01")]
    pub name: String,
    /// IPv4 address
    #[schema(example = "10.0.0.12")]
    pub ip: Option<String>,
    #[schema(example = "Hetzner")]
    pub hoster: Option<String>,
    pub location: Option<String>,
    pub parent_id: Option<Id>,
    /// Hex colour `#rrggbb`
    #[schema(example = "#64748b")]
    pub color: Option<String>,
    pub note: Option<String>,
}

impl From<CreateServerRequest> for ServerInput {
    fn from(r: CreateServerRequest) -> Self {
        Self {
            name: r.name,
            ip: r.ip,
            hoster: r.hoster,
            location: r.location,
            parent_id: r.parent_id,
            color: r.color,
            note: r.note,
        }
    }
}

/// Partial server update. Omitted fields are kept, `null` clears.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateServerRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub ip: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub hoster: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i64>)]
    pub parent_id: Option<Option<Id>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub color: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub note: Option<Option<String>>,
}

impl UpdateServerRequest {
    pub(crate) fn apply(self, current: &Server) -> ServerInput {
        let current = ServerInput::from(current);
        ServerInput {
            name: self.name.unwrap_or(current.name),
            ip: patch_nullable(current.ip, self.ip),
            hoster: patch_nullable(current.hoster, self.hoster),
            location: patch_nullable(current.location, self.location),
            parent_id: patch_nullable(current.parent_id, self.parent_id),
            color: patch_nullable(current.color, self.color),
            note: patch_nullable(current.note, self.note),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListServersQuery {
    /// Maximum number of items to return
    #[param(example = 50)]
    pub limit: Option<usize>,
    /// Number of items to skip
    #[param(example = 0)]
    pub offset: Option<usize>,
    /// Field to sort by (name, ip, hoster, location, created_at, updated_at)
    #[param(example = "name")]
    pub sort: Option<String>,
    /// Sort order (asc, desc)
    #[param(example = "asc")]
    pub order: Option<String>,
    /// Case-insensitive search on name, ip and location
    pub q: Option<String>,
    /// Exact hoster name
    pub hoster: Option<String>,
    /// Only children of this server
    pub parent_id: Option<Id>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PageQuery {
    #[param(example = 50)]
    pub limit: Option<usize>,
    #[param(example = 0)]
    pub offset: Option<usize>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedServers {
    pub items: Vec<ServerResponse>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Load a server with its services and child servers.
pub(crate) async fn server_detail<D: Database>(
    db: &D,
    id: Id,
) -> DbResult<ServerDetailResponse> {
    let server = db.servers().get(id).await?;
    let services = db
        .services()
        .list(Some(&ServiceQuery {
            server_id: Some(id),
            ..Default::default()
        }))
        .await?;
    let children = db
        .servers()
        .list(Some(&ServerQuery {
            parent_id: Some(id),
            ..Default::default()
        }))
        .await?;

    Ok(ServerDetailResponse {
        server: server.into(),
        services: services.items.into_iter().map(ServiceResponse::from).collect(),
        children: children.items.into_iter().map(ServerResponse::from).collect(),
    })
}

// =============================================================================
// Handlers
// =============================================================================

/// List servers
///
/// Returns a paginated list of servers with optional search and filters
#[utoipa::path(
    get,
    path = "/api/v1/servers",
    tag = "servers",
    params(ListServersQuery),
    responses(
        (status = 200, description = "Paginated list of servers", body = PaginatedServers),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[instrument(skip(state))]
pub async fn list_servers<D: Database>(
    State(state): State<AppState<D>>,
    Query(query): Query<ListServersQuery>,
) -> Result<Json<PaginatedServers>, ApiError> {
    let db_query = ServerQuery {
        page: page_sort(query.limit, query.offset, query.sort, query.order.as_deref()),
        q: query.q,
        hoster: query.hoster,
        parent_id: query.parent_id,
    };

    let result = state.db().servers().list(Some(&db_query)).await?;

    Ok(Json(PaginatedServers {
        items: result.items.into_iter().map(ServerResponse::from).collect(),
        total: result.total,
        limit: result.limit.unwrap_or(super::DEFAULT_PAGE_LIMIT),
        offset: result.offset,
    }))
}

/// Get a server
///
/// Returns the server together with its services and child servers
#[utoipa::path(
    get,
    path = "/api/v1/servers/{id}",
    tag = "servers",
    params(("id" = i64, Path, description = "Server ID")),
    responses(
        (status = 200, description = "Server found", body = ServerDetailResponse),
        (status = 404, description = "Server not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[instrument(skip(state))]
pub async fn get_server<D: Database>(
    State(state): State<AppState<D>>,
    Path(id): Path<Id>,
) -> Result<Json<ServerDetailResponse>, ApiError> {
    Ok(Json(server_detail(state.db(), id).await?))
}

/// Create a server
#[utoipa::path(
    post,
    path = "/api/v1/servers",
    tag = "servers",
    request_body = CreateServerRequest,
    responses(
        (status = 201, description = "Server created", body = ServerResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[instrument(skip(state))]
pub async fn create_server<D: Database>(
    State(state): State<AppState<D>>,
    payload: Result<Json<CreateServerRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ServerResponse>), ApiError> {
    let Json(request) = payload?;
    let input = ServerInput::from(request);
    input.validate()?;

    let server = state.db().servers().create(&input).await?;
    Ok((StatusCode::CREATED, Json(server.into())))
}

/// Update a server
///
/// Only the fields present in the body are changed
#[utoipa::path(
    put,
    path = "/api/v1/servers/{id}",
    tag = "servers",
    params(("id" = i64, Path, description = "Server ID")),
    request_body = UpdateServerRequest,
    responses(
        (status = 200, description = "Server updated", body = ServerResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Server not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[instrument(skip(state))]
pub async fn update_server<D: Database>(
    State(state): State<AppState<D>>,
    Path(id): Path<Id>,
    payload: Result<Json<UpdateServerRequest>, JsonRejection>,
) -> Result<Json<ServerResponse>, ApiError> {
    let Json(request) = payload?;
    let current = state.db().servers().get(id).await?;

    let input = request.apply(&current);
    input.validate()?;

    let server = state.db().servers().update(id, &input).await?;
    Ok(Json(server.into()))
}

/// Delete a server
///
/// Its services and their dependency edges are removed as well
#[utoipa::path(
    delete,
    path = "/api/v1/servers/{id}",
    tag = "servers",
    params(("id" = i64, Path, description = "Server ID")),
    responses(
        (status = 204, description = "Server deleted"),
        (status = 404, description = "Server not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[instrument(skip(state))]
pub async fn delete_server<D: Database>(
    State(state): State<AppState<D>>,
    Path(id): Path<Id>,
) -> Result<StatusCode, ApiError> {
    state.db().servers().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List the services hosted on a server
#[utoipa::path(
    get,
    path = "/api/v1/servers/{id}/services",
    tag = "servers",
    params(("id" = i64, Path, description = "Server ID"), PageQuery),
    responses(
        (status = 200, description = "Paginated list of services", body = PaginatedServices),
        (status = 404, description = "Server not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[instrument(skip(state))]
pub async fn list_server_services<D: Database>(
    State(state): State<AppState<D>>,
    Path(id): Path<Id>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PaginatedServices>, ApiError> {
    state.db().servers().get(id).await?;

    let result = state
        .db()
        .services()
        .list(Some(&ServiceQuery {
            page: page_sort(query.limit, query.offset, query.sort, query.order.as_deref()),
            server_id: Some(id),
            q: None,
        }))
        .await?;

    Ok(Json(PaginatedServices {
        items: result.items.into_iter().map(ServiceResponse::from).collect(),
        total: result.total,
        limit: result.limit.unwrap_or(super::DEFAULT_PAGE_LIMIT),
        offset: result.offset,
    }))
}
