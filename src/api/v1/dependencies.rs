//! Service dependency handlers.

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
    Database, DbError, Dependency, DependencyInput, DependencyQuery, DependencyRepository,
    DependencyType, Id, ServiceRepository,
};
use crate::serde_utils::{double_option, patch_nullable};

// =============================================================================
// DTOs (Data Transfer Objects)
// =============================================================================

/// Dependency edge: `service_id` depends on `depends_on_id`
#[derive(Debug, Serialize, ToSchema)]
pub struct DependencyResponse {
    #[schema(example = 7)]
    pub id: Id,
    #[schema(example = 3)]
    pub service_id: Id,
    #[schema(example = 4)]
    pub depends_on_id: Id,
    #[schema(example = "reads from")]
    pub label: Option<String>,
    pub dependency_type: DependencyType,
    pub created_at: DateTime<Utc>,
}

impl From<Dependency> for DependencyResponse {
    fn from(d: Dependency) -> Self {
        Self {
            id: d.id,
            service_id: d.service_id,
            depends_on_id: d.depends_on_id,
            label: d.label,
            dependency_type: d.dependency_type,
            created_at: d.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDependencyRequest {
    pub service_id: Id,
    pub depends_on_id: Id,
    pub label: Option<String>,
    /// Defaults to `required`
    #[serde(default)]
    pub dependency_type: DependencyType,
}

/// Update label and type. The endpoints of an edge never change.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateDependencyRequest {
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub label: Option<Option<String>>,
    pub dependency_type: Option<DependencyType>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListDependenciesQuery {
    #[param(example = 50)]
    pub limit: Option<usize>,
    #[param(example = 0)]
    pub offset: Option<usize>,
    /// Field to sort by (id, service_id, dependency_type, created_at)
    pub sort: Option<String>,
    /// Sort order (asc, desc)
    pub order: Option<String>,
    /// Edges touching this service at either end
    pub service_id: Option<Id>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedDependencies {
    pub items: Vec<DependencyResponse>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Fail with 400 when the referenced service does not exist.
pub(crate) async fn ensure_service_exists<D: Database>(
    db: &D,
    service_id: Id,
) -> Result<(), ApiError> {
    match db.services().get(service_id).await {
        Ok(_) => Ok(()),
        Err(DbError::NotFound { .. }) => Err(ApiError::Validation(format!(
            "Service {} does not exist",
            service_id
        ))),
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// List dependency edges
#[utoipa::path(
    get,
    path = "/api/v1/dependencies",
    tag = "dependencies",
    params(ListDependenciesQuery),
    responses(
        (status = 200, description = "Paginated list of dependencies", body = PaginatedDependencies),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[instrument(skip(state))]
pub async fn list_dependencies<D: Database>(
    State(state): State<AppState<D>>,
    Query(query): Query<ListDependenciesQuery>,
) -> Result<Json<PaginatedDependencies>, ApiError> {
    let db_query = DependencyQuery {
        page: page_sort(query.limit, query.offset, query.sort, query.order.as_deref()),
        service_id: query.service_id,
    };

    let result = state.db().dependencies().list(Some(&db_query)).await?;

    Ok(Json(PaginatedDependencies {
        items: result.items.into_iter().map(DependencyResponse::from).collect(),
        total: result.total,
        limit: result.limit.unwrap_or(super::DEFAULT_PAGE_LIMIT),
        offset: result.offset,
    }))
}

/// Get a dependency edge
#[utoipa::path(
    get,
    path = "/api/v1/dependencies/{id}",
    tag = "dependencies",
    params(("id" = i64, Path, description = "Dependency ID")),
    responses(
        (status = 200, description = "Dependency found", body = DependencyResponse),
        (status = 404, description = "Dependency not found", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[instrument(skip(state))]
pub async fn get_dependency<D: Database>(
    State(state): State<AppState<D>>,
    Path(id): Path<Id>,
) -> Result<Json<DependencyResponse>, ApiError> {
    let dependency = state.db().dependencies().get(id).await?;
    Ok(Json(dependency.into()))
}

/// Attach a dependency
#[utoipa::path(
    post,
    path = "/api/v1/dependencies",
    tag = "dependencies",
    request_body = CreateDependencyRequest,
    responses(
        (status = 201, description = "Dependency created", body = DependencyResponse),
        (status = 400, description = "Invalid input, unknown or identical services", body = ErrorResponse),
        (status = 409, description = "Edge already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[instrument(skip(state))]
pub async fn create_dependency<D: Database>(
    State(state): State<AppState<D>>,
    payload: Result<Json<CreateDependencyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DependencyResponse>), ApiError> {
    let Json(request) = payload?;
    let input = DependencyInput {
        service_id: request.service_id,
        depends_on_id: request.depends_on_id,
        label: request.label,
        dependency_type: request.dependency_type,
    };
    input.validate()?;
    ensure_service_exists(state.db(), input.service_id).await?;
    ensure_service_exists(state.db(), input.depends_on_id).await?;

    let dependency = state.db().dependencies().create(&input).await?;
    Ok((StatusCode::CREATED, Json(dependency.into())))
}

/// Update a dependency's label or type
#[utoipa::path(
    put,
    path = "/api/v1/dependencies/{id}",
    tag = "dependencies",
    params(("id" = i64, Path, description = "Dependency ID")),
    request_body = UpdateDependencyRequest,
    responses(
        (status = 200, description = "Dependency updated", body = DependencyResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Dependency not found", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[instrument(skip(state))]
pub async fn update_dependency<D: Database>(
    State(state): State<AppState<D>>,
    Path(id): Path<Id>,
    payload: Result<Json<UpdateDependencyRequest>, JsonRejection>,
) -> Result<Json<DependencyResponse>, ApiError> {
    let Json(request) = payload?;
    let current = state.db().dependencies().get(id).await?;

    let input = DependencyInput {
        service_id: current.service_id,
        depends_on_id: current.depends_on_id,
        label: patch_nullable(current.label, request.label),
        dependency_type: request.dependency_type.unwrap_or(current.dependency_type),
    };
    input.validate()?;

    let dependency = state.db().dependencies().update(id, &input).await?;
    Ok(Json(dependency.into()))
}

/// Detach a dependency
#[utoipa::path(
    delete,
    path = "/api/v1/dependencies/{id}",
    tag = "dependencies",
    params(("id" = i64, Path, description = "Dependency ID")),
    responses(
        (status = 204, description = "Dependency deleted"),
        (status = 404, description = "Dependency not found", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[instrument(skip(state))]
pub async fn delete_dependency<D: Database>(
    State(state): State<AppState<D>>,
    Path(id): Path<Id>,
) -> Result<StatusCode, ApiError> {
    state.db().dependencies().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
