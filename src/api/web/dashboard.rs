use axum::extract::State;
use axum::http::Uri;
use axum::response::Response;
use serde::Serialize;
use tracing::instrument;

use super::page::render;
use crate::api::extract::SessionUser;
use crate::api::v1::DashboardResponse;
use crate::api::{ApiError, AppState};
use crate::db::{Database, User};
use crate::graph::{Graph, load_dashboard};

#[derive(Serialize)]
struct DashboardProps {
    user: User,
    stats: DashboardResponse,
    graph: Graph,
}

/// `GET /`
#[instrument(skip(state, user))]
pub async fn dashboard<D: Database>(
    State(state): State<AppState<D>>,
    user: SessionUser,
    uri: Uri,
) -> Result<Response, ApiError> {
    let (summary, graph) = load_dashboard(state.db()).await?;

    let props = DashboardProps {
        user: user.user,
        stats: summary.into(),
        graph,
    };
    render(&state, &user.session_id, "dashboard", &uri, props)
}
