//! Health endpoints.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::{instrument, warn};
use utoipa::ToSchema;

use crate::api::{ApiError, AppState, ErrorResponse};
use crate::db::{
    Database, DependencyQuery, DependencyRepository, PageSort, ServerRepository,
    ServiceRepository,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryCounts {
    pub servers: usize,
    pub services: usize,
    pub dependencies: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SystemHealthResponse {
    /// `ok` or `degraded`
    #[schema(example = "ok")]
    pub status: String,
    /// `ok` or `error`
    #[schema(example = "ok")]
    pub database: String,
    #[schema(example = "0.1.0")]
    pub version: String,
    /// Absent when the database is unreachable
    pub counts: Option<InventoryCounts>,
}

/// Liveness probe, no authentication
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Process is up", body = HealthResponse))
)]
#[instrument]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn inventory_counts<D: Database>(db: &D) -> Result<InventoryCounts, ApiError> {
    let dependencies = db
        .dependencies()
        .list(Some(&DependencyQuery {
            page: PageSort {
                limit: Some(1),
                ..Default::default()
            },
            service_id: None,
        }))
        .await?;

    Ok(InventoryCounts {
        servers: db.servers().count().await?,
        services: db.services().count().await?,
        dependencies: dependencies.total,
    })
}

/// System health
///
/// Checks the database connection and reports inventory counts
#[utoipa::path(
    get,
    path = "/api/v1/system/health",
    tag = "system",
    responses(
        (status = 200, description = "Health report", body = SystemHealthResponse),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[instrument(skip(state))]
pub async fn system_health<D: Database>(
    State(state): State<AppState<D>>,
) -> Json<SystemHealthResponse> {
    let version = env!("CARGO_PKG_VERSION").to_string();

    let counts = match state.db().ping().await {
        Ok(()) => inventory_counts(state.db()).await,
        Err(e) => Err(e.into()),
    };

    match counts {
        Ok(counts) => Json(SystemHealthResponse {
            status: "ok".to_string(),
            database: "ok".to_string(),
            version,
            counts: Some(counts),
        }),
        Err(e) => {
            warn!("Health check failed: {}", e);
            Json(SystemHealthResponse {
                status: "degraded".to_string(),
                database: "error".to_string(),
                version,
                counts: None,
            })
        }
    }
}
