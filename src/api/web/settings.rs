//! Settings page: hosters and API keys.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Uri};
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use tracing::{info, instrument};

use super::page::{back, finish, render};
use crate::api::extract::SessionUser;
use crate::api::{ApiError, AppState};
use crate::auth::api_key;
use crate::db::{ApiKey, ApiKeyRepository, Database, Hoster, HosterInput, HosterRepository, Id};
use crate::serde_utils::{double_option, patch_nullable};

const SETTINGS_PATH: &str = "/settings";

#[derive(Debug, Serialize)]
pub struct HosterResponse {
    pub id: Id,
    pub name: String,
    pub hoster_type: Option<String>,
    pub description: Option<String>,
    pub display_order: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Hoster> for HosterResponse {
    fn from(h: Hoster) -> Self {
        Self {
            id: h.id,
            name: h.name,
            hoster_type: h.hoster_type,
            description: h.description,
            display_order: h.display_order,
            is_active: h.is_active,
            created_at: h.created_at,
            updated_at: h.updated_at,
        }
    }
}

/// An API key as listed on the settings page. The hash never leaves the server.
#[derive(Debug, Serialize)]
pub struct ApiKeyResponse {
    pub id: Id,
    pub name: String,
    pub key_prefix: String,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<ApiKey> for ApiKeyResponse {
    fn from(k: ApiKey) -> Self {
        Self {
            id: k.id,
            name: k.name,
            key_prefix: k.key_prefix,
            last_used_at: k.last_used_at,
            expires_at: k.expires_at,
            created_at: k.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateHosterRequest {
    pub name: String,
    pub hoster_type: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub display_order: i64,
    pub is_active: Option<bool>,
}

impl From<CreateHosterRequest> for HosterInput {
    fn from(r: CreateHosterRequest) -> Self {
        Self {
            name: r.name,
            hoster_type: r.hoster_type,
            description: r.description,
            display_order: r.display_order,
            is_active: r.is_active.unwrap_or(true),
        }
    }
}

/// Partial hoster update. Omitted fields are kept, `null` clears.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateHosterRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub hoster_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub display_order: Option<i64>,
    pub is_active: Option<bool>,
}

impl UpdateHosterRequest {
    fn apply(self, current: Hoster) -> HosterInput {
        HosterInput {
            name: self.name.unwrap_or(current.name),
            hoster_type: patch_nullable(current.hoster_type, self.hoster_type),
            description: patch_nullable(current.description, self.description),
            display_order: self.display_order.unwrap_or(current.display_order),
            is_active: self.is_active.unwrap_or(current.is_active),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReorderHostersRequest {
    pub ids: Vec<Id>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateApiKeyRequest {
    #[validate(min_length = 1)]
    #[validate(max_length = 100)]
    pub name: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct IndexProps {
    hosters: Vec<HosterResponse>,
    api_keys: Vec<ApiKeyResponse>,
}

/// `GET /settings`
#[instrument(skip(state, user))]
pub async fn index<D: Database>(
    State(state): State<AppState<D>>,
    user: SessionUser,
    uri: Uri,
) -> Result<Response, ApiError> {
    let hosters = state.db().hosters().list(false).await?;
    let api_keys = state.db().api_keys().list(None).await?;

    let props = IndexProps {
        hosters: hosters.into_iter().map(HosterResponse::from).collect(),
        api_keys: api_keys.into_iter().map(ApiKeyResponse::from).collect(),
    };
    render(&state, &user.session_id, "settings/index", &uri, props)
}

/// `POST /settings/hosters`
#[instrument(skip(state, user, headers))]
pub async fn store_hoster<D: Database>(
    State(state): State<AppState<D>>,
    user: SessionUser,
    headers: HeaderMap,
    payload: Result<Json<CreateHosterRequest>, JsonRejection>,
) -> Response {
    let result: Result<Hoster, ApiError> = async {
        let Json(request) = payload?;
        let input = HosterInput::from(request);
        input.validate()?;
        Ok(state.db().hosters().create(&input).await?)
    }
    .await;

    let to = back(&headers, SETTINGS_PATH);
    finish(
        &state,
        &user.session_id,
        result,
        |hoster| (format!("Hoster '{}' created", hoster.name), to.clone()),
        &to,
    )
}

/// `PUT /settings/hosters/{id}`
#[instrument(skip(state, user, headers))]
pub async fn update_hoster<D: Database>(
    State(state): State<AppState<D>>,
    user: SessionUser,
    headers: HeaderMap,
    Path(id): Path<Id>,
    payload: Result<Json<UpdateHosterRequest>, JsonRejection>,
) -> Response {
    let result: Result<Hoster, ApiError> = async {
        let Json(request) = payload?;
        let current = state.db().hosters().get(id).await?;
        let input = request.apply(current);
        input.validate()?;
        Ok(state.db().hosters().update(id, &input).await?)
    }
    .await;

    let to = back(&headers, SETTINGS_PATH);
    finish(
        &state,
        &user.session_id,
        result,
        |hoster| (format!("Hoster '{}' updated", hoster.name), to.clone()),
        &to,
    )
}

/// `DELETE /settings/hosters/{id}`
#[instrument(skip(state, user, headers))]
pub async fn destroy_hoster<D: Database>(
    State(state): State<AppState<D>>,
    user: SessionUser,
    headers: HeaderMap,
    Path(id): Path<Id>,
) -> Response {
    let result: Result<Hoster, ApiError> = async {
        let hoster = state.db().hosters().get(id).await?;
        state.db().hosters().delete(id).await?;
        Ok(hoster)
    }
    .await;

    let to = back(&headers, SETTINGS_PATH);
    finish(
        &state,
        &user.session_id,
        result,
        |hoster| (format!("Hoster '{}' deleted", hoster.name), to.clone()),
        &to,
    )
}

/// `POST /settings/hosters/reorder`
#[instrument(skip(state, user, headers))]
pub async fn reorder_hosters<D: Database>(
    State(state): State<AppState<D>>,
    user: SessionUser,
    headers: HeaderMap,
    payload: Result<Json<ReorderHostersRequest>, JsonRejection>,
) -> Response {
    let result: Result<(), ApiError> = async {
        let Json(request) = payload?;
        Ok(state.db().hosters().reorder(&request.ids).await?)
    }
    .await;

    let to = back(&headers, SETTINGS_PATH);
    finish(
        &state,
        &user.session_id,
        result,
        |_| ("Hoster order saved".to_string(), to.clone()),
        &to,
    )
}

/// `POST /settings/api-keys`
///
/// The plain key is only ever shown in the success flash.
#[instrument(skip(state, user, headers, payload))]
pub async fn store_api_key<D: Database>(
    State(state): State<AppState<D>>,
    user: SessionUser,
    headers: HeaderMap,
    payload: Result<Json<CreateApiKeyRequest>, JsonRejection>,
) -> Response {
    let result: Result<(ApiKey, String), ApiError> = async {
        let Json(request) = payload?;
        request.validate()?;
        if request.expires_at.is_some_and(|exp| exp <= Utc::now()) {
            return Err(ApiError::Validation(
                "expires_at: must be in the future".to_string(),
            ));
        }
        let issued =
            api_key::issue(state.db(), Some(user.user.id), &request.name, request.expires_at)
                .await?;
        Ok(issued)
    }
    .await;

    let to = back(&headers, SETTINGS_PATH);
    finish(
        &state,
        &user.session_id,
        result,
        |(key, plain)| {
            info!(user_id = user.user.id, key_prefix = %key.key_prefix, "API key created");
            (
                format!(
                    "API key '{}' created. Copy it now, it will not be shown again: {}",
                    key.name, plain
                ),
                to.clone(),
            )
        },
        &to,
    )
}

/// `DELETE /settings/api-keys/{id}`
#[instrument(skip(state, user, headers))]
pub async fn destroy_api_key<D: Database>(
    State(state): State<AppState<D>>,
    user: SessionUser,
    headers: HeaderMap,
    Path(id): Path<Id>,
) -> Response {
    let result = state
        .db()
        .api_keys()
        .delete(id)
        .await
        .map_err(ApiError::from);

    let to = back(&headers, SETTINGS_PATH);
    finish(
        &state,
        &user.session_id,
        result,
        |_| ("API key revoked".to_string(), to.clone()),
        &to,
    )
}
