//! Service pages, form actions and dependency attach/detach.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Uri};
use axum::response::Response;
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use tracing::instrument;

use super::images::ServiceImageResponse;
use super::page::{back, finish, flash_redirect, render};
use crate::api::extract::SessionUser;
use crate::api::v1::{
    CreateServiceRequest, ServerResponse, ServiceDetailResponse, ServiceResponse,
    UpdateServiceRequest, ensure_server_exists, ensure_service_exists, service_detail,
};
use crate::api::{ApiError, AppState};
use crate::auth::session::FlashKind;
use crate::db::{
    Database, DbError, Dependency, DependencyInput, DependencyRepository, DependencyType, Id,
    ServerRepository, Service, ServiceImageRepository, ServiceInput, ServiceQuery,
    ServiceRepository,
};

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ServiceFilters {
    pub server_id: Option<Id>,
    pub q: Option<String>,
}

#[derive(Serialize)]
struct IndexProps {
    services: Vec<ServiceResponse>,
    servers: Vec<ServerResponse>,
    filters: ServiceFilters,
}

#[derive(Serialize)]
struct ShowProps {
    service: ServiceDetailResponse,
    server: ServerResponse,
    servers: Vec<ServerResponse>,
    /// Candidates for a new dependency
    services: Vec<ServiceResponse>,
    images: Vec<ServiceImageResponse>,
}

/// Form body for attaching a dependency from a service page.
#[derive(Debug, Deserialize)]
pub struct AttachDependencyRequest {
    pub depends_on_id: Id,
    pub label: Option<String>,
    #[serde(default)]
    pub dependency_type: DependencyType,
}

async fn all_servers<D: Database>(db: &D) -> Result<Vec<ServerResponse>, ApiError> {
    let servers = db.servers().list(None).await?;
    Ok(servers.items.into_iter().map(ServerResponse::from).collect())
}

/// `GET /services`
#[instrument(skip(state, user))]
pub async fn index<D: Database>(
    State(state): State<AppState<D>>,
    user: SessionUser,
    uri: Uri,
    Query(filters): Query<ServiceFilters>,
) -> Result<Response, ApiError> {
    let services = state
        .db()
        .services()
        .list(Some(&ServiceQuery {
            server_id: filters.server_id,
            q: filters.q.clone(),
            ..Default::default()
        }))
        .await?;

    let props = IndexProps {
        services: services.items.into_iter().map(ServiceResponse::from).collect(),
        servers: all_servers(state.db()).await?,
        filters,
    };
    render(&state, &user.session_id, "services/index", &uri, props)
}

/// `GET /services/{id}`
#[instrument(skip(state, user))]
pub async fn show<D: Database>(
    State(state): State<AppState<D>>,
    user: SessionUser,
    uri: Uri,
    Path(id): Path<Id>,
) -> Result<Response, ApiError> {
    let service = match service_detail(state.db(), id).await {
        Ok(service) => service,
        Err(e @ DbError::NotFound { .. }) => {
            return Ok(flash_redirect(
                &state,
                &user.session_id,
                FlashKind::Error,
                ApiError::from(e).to_string(),
                "/services",
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let server = state
        .db()
        .servers()
        .get(service.service.server_id)
        .await?
        .into();
    let candidates = state.db().services().list(None).await?;
    let images = state.db().service_images().list().await?;

    let props = ShowProps {
        service,
        server,
        servers: all_servers(state.db()).await?,
        services: candidates
            .items
            .into_iter()
            .filter(|s| s.id != id)
            .map(ServiceResponse::from)
            .collect(),
        images: images.into_iter().map(ServiceImageResponse::from).collect(),
    };
    render(&state, &user.session_id, "services/show", &uri, props)
}

/// `POST /services`
#[instrument(skip(state, user, headers))]
pub async fn store<D: Database>(
    State(state): State<AppState<D>>,
    user: SessionUser,
    headers: HeaderMap,
    payload: Result<Json<CreateServiceRequest>, JsonRejection>,
) -> Response {
    let result: Result<Service, ApiError> = async {
        let Json(request) = payload?;
        let input = ServiceInput::from(request);
        input.validate()?;
        ensure_server_exists(state.db(), input.server_id).await?;
        Ok(state.db().services().create(&input).await?)
    }
    .await;

    finish(
        &state,
        &user.session_id,
        result,
        |service| {
            (
                format!("Service '{}' created", service.name),
                format!("/services/{}", service.id),
            )
        },
        &back(&headers, "/services"),
    )
}

/// `PUT /services/{id}`
#[instrument(skip(state, user, headers))]
pub async fn update<D: Database>(
    State(state): State<AppState<D>>,
    user: SessionUser,
    headers: HeaderMap,
    Path(id): Path<Id>,
    payload: Result<Json<UpdateServiceRequest>, JsonRejection>,
) -> Response {
    let result: Result<Service, ApiError> = async {
        let Json(request) = payload?;
        let current = state.db().services().get(id).await?;
        let input = request.apply(&current);
        input.validate()?;
        if input.server_id != current.server_id {
            ensure_server_exists(state.db(), input.server_id).await?;
        }
        Ok(state.db().services().update(id, &input).await?)
    }
    .await;

    let to = back(&headers, &format!("/services/{}", id));
    finish(
        &state,
        &user.session_id,
        result,
        |service| (format!("Service '{}' updated", service.name), to.clone()),
        &to,
    )
}

/// `DELETE /services/{id}`
#[instrument(skip(state, user, headers))]
pub async fn destroy<D: Database>(
    State(state): State<AppState<D>>,
    user: SessionUser,
    headers: HeaderMap,
    Path(id): Path<Id>,
) -> Response {
    let result: Result<Service, ApiError> = async {
        let service = state.db().services().get(id).await?;
        state.db().services().delete(id).await?;
        Ok(service)
    }
    .await;

    finish(
        &state,
        &user.session_id,
        result,
        |service| {
            (
                format!("Service '{}' deleted", service.name),
                "/services".to_string(),
            )
        },
        &back(&headers, "/services"),
    )
}

/// `POST /services/{id}/dependencies`
#[instrument(skip(state, user, headers))]
pub async fn attach_dependency<D: Database>(
    State(state): State<AppState<D>>,
    user: SessionUser,
    headers: HeaderMap,
    Path(id): Path<Id>,
    payload: Result<Json<AttachDependencyRequest>, JsonRejection>,
) -> Response {
    let result: Result<Dependency, ApiError> = async {
        let Json(request) = payload?;
        let input = DependencyInput {
            service_id: id,
            depends_on_id: request.depends_on_id,
            label: request.label,
            dependency_type: request.dependency_type,
        };
        input.validate()?;
        ensure_service_exists(state.db(), id).await?;
        ensure_service_exists(state.db(), input.depends_on_id).await?;
        Ok(state.db().dependencies().create(&input).await?)
    }
    .await;

    let to = back(&headers, &format!("/services/{}", id));
    finish(
        &state,
        &user.session_id,
        result,
        |_| ("Dependency added".to_string(), to.clone()),
        &to,
    )
}

/// `DELETE /services/{id}/dependencies/{dep_id}`
///
/// Either end of the edge may be `id`.
#[instrument(skip(state, user, headers))]
pub async fn detach_dependency<D: Database>(
    State(state): State<AppState<D>>,
    user: SessionUser,
    headers: HeaderMap,
    Path((id, dep_id)): Path<(Id, Id)>,
) -> Response {
    let result: Result<(), ApiError> = async {
        let dependency = state.db().dependencies().get(dep_id).await?;
        if dependency.service_id != id && dependency.depends_on_id != id {
            return Err(DbError::not_found("Dependency", dep_id).into());
        }
        state.db().dependencies().delete(dep_id).await?;
        Ok(())
    }
    .await;

    let to = back(&headers, &format!("/services/{}", id));
    finish(
        &state,
        &user.session_id,
        result,
        |_| ("Dependency removed".to_string(), to.clone()),
        &to,
    )
}
