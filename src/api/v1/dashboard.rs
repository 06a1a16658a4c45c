//! Dashboard aggregates and the dependency graph.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;
use utoipa::ToSchema;

use super::ServiceResponse;
use crate::api::{ApiError, AppState, ErrorResponse};
use crate::db::Database;
use crate::graph::{DashboardSummary, Graph, GraphStats, load_dashboard, load_graph};

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub servers: usize,
    pub services: usize,
    pub dependencies: usize,
    /// Active hosters only
    pub hosters: usize,
    pub stats: GraphStats,
    /// Most recently maintained services, newest first
    pub recent_maintenance: Vec<ServiceResponse>,
}

impl From<DashboardSummary> for DashboardResponse {
    fn from(summary: DashboardSummary) -> Self {
        Self {
            servers: summary.servers,
            services: summary.services,
            dependencies: summary.dependencies,
            hosters: summary.hosters,
            stats: summary.stats,
            recent_maintenance: summary
                .recent_maintenance
                .into_iter()
                .map(ServiceResponse::from)
                .collect(),
        }
    }
}

/// Dashboard counts
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    tag = "dashboard",
    responses(
        (status = 200, description = "Inventory aggregates", body = DashboardResponse),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[instrument(skip(state))]
pub async fn get_dashboard<D: Database>(
    State(state): State<AppState<D>>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let (summary, _graph) = load_dashboard(state.db()).await?;
    Ok(Json(summary.into()))
}

/// Dependency graph
///
/// One node per server and service, one edge per dependency
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/graph",
    tag = "dashboard",
    responses(
        (status = 200, description = "Nodes and edges", body = Graph),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[instrument(skip(state))]
pub async fn get_dependency_graph<D: Database>(
    State(state): State<AppState<D>>,
) -> Result<Json<Graph>, ApiError> {
    let graph = load_graph(state.db()).await?;
    Ok(Json(graph))
}
