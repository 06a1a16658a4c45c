//! Service inventory handlers.

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

use super::page_sort;
use crate::api::{ApiError, AppState, ErrorResponse};
use crate::db::{
    Database, DbError, DbResult, DependencyRepository, DependencyType, Id, LinkedService,
    ServerRepository, Service, ServiceInput, ServicePort, ServiceQuery, ServiceRepository,
};
use crate::serde_utils::{double_option, patch_nullable};

// =============================================================================
// DTOs (Data Transfer Objects)
// =============================================================================

/// Service response DTO
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceResponse {
    #[schema(example = 3)]
    pub id: Id,
    #[schema(example = 1)]
    pub server_id: Id,
    #[schema(example = "postgres")]
    pub name: String,
    /// Icon filename or URL
    pub icon: Option<String>,
    #[schema(example = "/srv/postgres")]
    pub path: Option<String>,
    #[schema(example = "https://git.example.com/infra/postgres")]
    pub repo_url: Option<String>,
    pub doc_path: Option<String>,
    pub ports: Vec<ServicePort>,
    pub last_maintenance_at: Option<DateTime<Utc>>,
    #[schema(example = "#0ea5e9")]
    pub color: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Service> for ServiceResponse {
    fn from(s: Service) -> Self {
        Self {
            id: s.id,
            server_id: s.server_id,
            name: s.name,
            icon: s.icon,
            path: s.path,
            repo_url: s.repo_url,
            doc_path: s.doc_path,
            ports: s.ports,
            last_maintenance_at: s.last_maintenance_at,
            color: s.color,
            note: s.note,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

/// The service on the other end of a dependency edge
#[derive(Debug, Serialize, ToSchema)]
pub struct LinkedServiceResponse {
    pub dependency_id: Id,
    pub service_id: Id,
    pub name: String,
    pub server_id: Id,
    pub label: Option<String>,
    pub dependency_type: DependencyType,
}

impl From<LinkedService> for LinkedServiceResponse {
    fn from(l: LinkedService) -> Self {
        Self {
            dependency_id: l.dependency_id,
            service_id: l.service_id,
            name: l.name,
            server_id: l.server_id,
            label: l.label,
            dependency_type: l.dependency_type,
        }
    }
}

/// Service with both directions of its dependency edges
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceDetailResponse {
    #[serde(flatten)]
    pub service: ServiceResponse,
    /// Services this one depends on
    pub dependencies: Vec<LinkedServiceResponse>,
    /// Services that depend on this one
    pub dependents: Vec<LinkedServiceResponse>,
}

/// Create service request DTO
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateServiceRequest {
    #[schema(example = 1)]
    pub server_id: Id,
    #[schema(example = "postgres")]
    pub name: String,
    pub icon: Option<String>,
    pub path: Option<String>,
    /// http(s) URL
    pub repo_url: Option<String>,
    pub doc_path: Option<String>,
    #[serde(default)]
    pub ports: Vec<ServicePort>,
    pub last_maintenance_at: Option<DateTime<Utc>>,
    pub color: Option<String>,
    pub note: Option<String>,
}

impl From<CreateServiceRequest> for ServiceInput {
    fn from(r: CreateServiceRequest) -> Self {
        Self {
            server_id: r.server_id,
            name: r.name,
            icon: r.icon,
            path: r.path,
            repo_url: r.repo_url,
            doc_path: r.doc_path,
            ports: r.ports,
            last_maintenance_at: r.last_maintenance_at,
            color: r.color,
            note: r.note,
        }
    }
}

/// Partial service update. Omitted fields are kept, `null` clears.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateServiceRequest {
    pub server_id: Option<Id>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub icon: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub path: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub repo_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub doc_path: Option<Option<String>>,
    pub ports: Option<Vec<ServicePort>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub last_maintenance_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub color: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub note: Option<Option<String>>,
}

impl UpdateServiceRequest {
    pub(crate) fn apply(self, current: &Service) -> ServiceInput {
        let current = ServiceInput::from(current);
        ServiceInput {
            server_id: self.server_id.unwrap_or(current.server_id),
            name: self.name.unwrap_or(current.name),
            icon: patch_nullable(current.icon, self.icon),
            path: patch_nullable(current.path, self.path),
            repo_url: patch_nullable(current.repo_url, self.repo_url),
            doc_path: patch_nullable(current.doc_path, self.doc_path),
            ports: self.ports.unwrap_or(current.ports),
            last_maintenance_at: patch_nullable(
                current.last_maintenance_at,
                self.last_maintenance_at,
            ),
            color: patch_nullable(current.color, self.color),
            note: patch_nullable(current.note, self.note),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListServicesQuery {
    #[param(example = 50)]
    pub limit: Option<usize>,
    #[param(example = 0)]
    pub offset: Option<usize>,
    /// Field to sort by (name, server_id, last_maintenance_at, created_at, updated_at)
    #[param(example = "name")]
    pub sort: Option<String>,
    /// Sort order (asc, desc)
    pub order: Option<String>,
    /// Only services on this server
    pub server_id: Option<Id>,
    /// Case-insensitive search on name, path and note
    pub q: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedServices {
    pub items: Vec<ServiceResponse>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Fail with 400 when the referenced server does not exist.
pub(crate) async fn ensure_server_exists<D: Database>(
    db: &D,
    server_id: Id,
) -> Result<(), ApiError> {
    match db.servers().get(server_id).await {
        Ok(_) => Ok(()),
        Err(DbError::NotFound { .. }) => Err(ApiError::Validation(format!(
            "Server {} does not exist",
            server_id
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Load a service with both directions of its dependency edges.
pub(crate) async fn service_detail<D: Database>(
    db: &D,
    id: Id,
) -> DbResult<ServiceDetailResponse> {
    let service = db.services().get(id).await?;
    let dependencies = db.dependencies().dependencies_of(id).await?;
    let dependents = db.dependencies().dependents_of(id).await?;

    Ok(ServiceDetailResponse {
        service: service.into(),
        dependencies: dependencies.into_iter().map(Into::into).collect(),
        dependents: dependents.into_iter().map(Into::into).collect(),
    })
}

// =============================================================================
// Handlers
// =============================================================================

/// List services
#[utoipa::path(
    get,
    path = "/api/v1/services",
    tag = "services",
    params(ListServicesQuery),
    responses(
        (status = 200, description = "Paginated list of services", body = PaginatedServices),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[instrument(skip(state))]
pub async fn list_services<D: Database>(
    State(state): State<AppState<D>>,
    Query(query): Query<ListServicesQuery>,
) -> Result<Json<PaginatedServices>, ApiError> {
    let db_query = ServiceQuery {
        page: page_sort(query.limit, query.offset, query.sort, query.order.as_deref()),
        server_id: query.server_id,
        q: query.q,
    };

    let result = state.db().services().list(Some(&db_query)).await?;

    Ok(Json(PaginatedServices {
        items: result.items.into_iter().map(ServiceResponse::from).collect(),
        total: result.total,
        limit: result.limit.unwrap_or(super::DEFAULT_PAGE_LIMIT),
        offset: result.offset,
    }))
}

/// Get a service
///
/// Includes the services it depends on and the services depending on it
#[utoipa::path(
    get,
    path = "/api/v1/services/{id}",
    tag = "services",
    params(("id" = i64, Path, description = "Service ID")),
    responses(
        (status = 200, description = "Service found", body = ServiceDetailResponse),
        (status = 404, description = "Service not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[instrument(skip(state))]
pub async fn get_service<D: Database>(
    State(state): State<AppState<D>>,
    Path(id): Path<Id>,
) -> Result<Json<ServiceDetailResponse>, ApiError> {
    Ok(Json(service_detail(state.db(), id).await?))
}

/// Create a service
#[utoipa::path(
    post,
    path = "/api/v1/services",
    tag = "services",
    request_body = CreateServiceRequest,
    responses(
        (status = 201, description = "Service created", body = ServiceResponse),
        (status = 400, description = "Invalid input or unknown server", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[instrument(skip(state))]
pub async fn create_service<D: Database>(
    State(state): State<AppState<D>>,
    payload: Result<Json<CreateServiceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ServiceResponse>), ApiError> {
    let Json(request) = payload?;
    let input = ServiceInput::from(request);
    input.validate()?;
    ensure_server_exists(state.db(), input.server_id).await?;

    let service = state.db().services().create(&input).await?;
    Ok((StatusCode::CREATED, Json(service.into())))
}

/// Update a service
///
/// Only the fields present in the body are changed
#[utoipa::path(
    put,
    path = "/api/v1/services/{id}",
    tag = "services",
    params(("id" = i64, Path, description = "Service ID")),
    request_body = UpdateServiceRequest,
    responses(
        (status = 200, description = "Service updated", body = ServiceResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Service not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[instrument(skip(state))]
pub async fn update_service<D: Database>(
    State(state): State<AppState<D>>,
    Path(id): Path<Id>,
    payload: Result<Json<UpdateServiceRequest>, JsonRejection>,
) -> Result<Json<ServiceResponse>, ApiError> {
    let Json(request) = payload?;
    let current = state.db().services().get(id).await?;

    let input = request.apply(&current);
    input.validate()?;
    if input.server_id != current.server_id {
        ensure_server_exists(state.db(), input.server_id).await?;
    }

    let service = state.db().services().update(id, &input).await?;
    Ok(Json(service.into()))
}

/// Delete a service
#[utoipa::path(
    delete,
    path = "/api/v1/services/{id}",
    tag = "services",
    params(("id" = i64, Path, description = "Service ID")),
    responses(
        (status = 204, description = "Service deleted"),
        (status = 404, description = "Service not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[instrument(skip(state))]
pub async fn delete_service<D: Database>(
    State(state): State<AppState<D>>,
    Path(id): Path<Id>,
) -> Result<StatusCode, ApiError> {
    state.db().services().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Record maintenance
///
/// Sets `last_maintenance_at` to the current time
#[utoipa::path(
    post,
    path = "/api/v1/services/{id}/maintenance",
    tag = "services",
    params(("id" = i64, Path, description = "Service ID")),
    responses(
        (status = 200, description = "Maintenance recorded", body = ServiceResponse),
        (status = 404, description = "Service not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[instrument(skip(state))]
pub async fn mark_service_maintained<D: Database>(
    State(state): State<AppState<D>>,
    Path(id): Path<Id>,
) -> Result<Json<ServiceResponse>, ApiError> {
    let service = state.db().services().mark_maintained(id).await?;
    Ok(Json(service.into()))
}
