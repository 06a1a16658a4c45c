//! Server pages and form actions.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Uri};
use axum::response::Response;
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use tracing::instrument;

use super::page::{back, finish, flash_redirect, render};
use super::settings::HosterResponse;
use crate::api::extract::SessionUser;
use crate::api::v1::{
    CreateServerRequest, ServerDetailResponse, ServerResponse, UpdateServerRequest, server_detail,
};
use crate::api::{ApiError, AppState};
use crate::auth::session::FlashKind;
use crate::db::{
    Database, DbError, HosterRepository, Id, Server, ServerInput, ServerQuery, ServerRepository,
};

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ServerFilters {
    pub q: Option<String>,
    pub hoster: Option<String>,
}

#[derive(Serialize)]
struct IndexProps {
    servers: Vec<ServerResponse>,
    hosters: Vec<HosterResponse>,
    filters: ServerFilters,
}

#[derive(Serialize)]
struct ShowProps {
    server: ServerDetailResponse,
    parent: Option<ServerResponse>,
    /// Candidate parents for the edit form
    servers: Vec<ServerResponse>,
    hosters: Vec<HosterResponse>,
}

async fn active_hosters<D: Database>(db: &D) -> Result<Vec<HosterResponse>, ApiError> {
    let hosters = db.hosters().list(true).await?;
    Ok(hosters.into_iter().map(HosterResponse::from).collect())
}

/// `GET /servers`
#[instrument(skip(state, user))]
pub async fn index<D: Database>(
    State(state): State<AppState<D>>,
    user: SessionUser,
    uri: Uri,
    Query(filters): Query<ServerFilters>,
) -> Result<Response, ApiError> {
    let servers = state
        .db()
        .servers()
        .list(Some(&ServerQuery {
            q: filters.q.clone(),
            hoster: filters.hoster.clone(),
            ..Default::default()
        }))
        .await?;

    let props = IndexProps {
        servers: servers.items.into_iter().map(ServerResponse::from).collect(),
        hosters: active_hosters(state.db()).await?,
        filters,
    };
    render(&state, &user.session_id, "servers/index", &uri, props)
}

/// `GET /servers/{id}`
#[instrument(skip(state, user))]
pub async fn show<D: Database>(
    State(state): State<AppState<D>>,
    user: SessionUser,
    uri: Uri,
    Path(id): Path<Id>,
) -> Result<Response, ApiError> {
    let server = match server_detail(state.db(), id).await {
        Ok(server) => server,
        Err(e @ DbError::NotFound { .. }) => {
            return Ok(flash_redirect(
                &state,
                &user.session_id,
                FlashKind::Error,
                ApiError::from(e).to_string(),
                "/servers",
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let parent = match server.server.parent_id {
        Some(parent_id) => Some(state.db().servers().get(parent_id).await?.into()),
        None => None,
    };
    let servers = state.db().servers().list(None).await?;

    let props = ShowProps {
        server,
        parent,
        servers: servers
            .items
            .into_iter()
            .filter(|s| s.id != id)
            .map(ServerResponse::from)
            .collect(),
        hosters: active_hosters(state.db()).await?,
    };
    render(&state, &user.session_id, "servers/show", &uri, props)
}

/// `POST /servers`
#[instrument(skip(state, user, headers))]
pub async fn store<D: Database>(
    State(state): State<AppState<D>>,
    user: SessionUser,
    headers: HeaderMap,
    payload: Result<Json<CreateServerRequest>, JsonRejection>,
) -> Response {
    let result: Result<Server, ApiError> = async {
        let Json(request) = payload?;
        let input = ServerInput::from(request);
        input.validate()?;
        Ok(state.db().servers().create(&input).await?)
    }
    .await;

    finish(
        &state,
        &user.session_id,
        result,
        |server| {
            (
                format!("Server '{}' created", server.name),
                format!("/servers/{}", server.id),
            )
        },
        &back(&headers, "/servers"),
    )
}

/// `PUT /servers/{id}`
#[instrument(skip(state, user, headers))]
pub async fn update<D: Database>(
    State(state): State<AppState<D>>,
    user: SessionUser,
    headers: HeaderMap,
    Path(id): Path<Id>,
    payload: Result<Json<UpdateServerRequest>, JsonRejection>,
) -> Response {
    let result: Result<Server, ApiError> = async {
        let Json(request) = payload?;
        let current = state.db().servers().get(id).await?;
        let input = request.apply(&current);
        input.validate()?;
        Ok(state.db().servers().update(id, &input).await?)
    }
    .await;

    let to = back(&headers, &format!("/servers/{}", id));
    finish(
        &state,
        &user.session_id,
        result,
        |server| (format!("Server '{}' updated", server.name), to.clone()),
        &to,
    )
}

/// `DELETE /servers/{id}`
#[instrument(skip(state, user, headers))]
pub async fn destroy<D: Database>(
    State(state): State<AppState<D>>,
    user: SessionUser,
    headers: HeaderMap,
    Path(id): Path<Id>,
) -> Response {
    let result: Result<Server, ApiError> = async {
        let server = state.db().servers().get(id).await?;
        state.db().servers().delete(id).await?;
        Ok(server)
    }
    .await;

    finish(
        &state,
        &user.session_id,
        result,
        |server| {
            (
                format!("Server '{}' deleted", server.name),
                "/servers".to_string(),
            )
        },
        &back(&headers, "/servers"),
    )
}
