//! Request extractors for API key and session authentication.

use axum::extract::{FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{Redirect, Response};
use chrono::Utc;
use tracing::{debug, warn};

use super::{ApiError, AppState};
use crate::auth::AuthError;
use crate::auth::api_key;
use crate::auth::session::session_id_from_headers;
use crate::db::{ApiKey, Database, User, UserRepository};

pub const LOGIN_PATH: &str = "/auth/login";

fn extract_bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    let (scheme, token) = header.split_once(' ').ok_or(AuthError::MissingToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token.trim())
}

/// A request authenticated with a valid, unexpired API key.
#[derive(Debug, Clone)]
pub struct ApiKeyAuth(pub ApiKey);

impl<D: Database + 'static> FromRequestParts<AppState<D>> for ApiKeyAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<D>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(parts)?;
        let key = api_key::authenticate(state.db(), token).await?;
        debug!(key_prefix = %key.key_prefix, "API key accepted");
        Ok(ApiKeyAuth(key))
    }
}

/// Middleware rejecting requests without a valid API key.
pub async fn require_api_key(auth: ApiKeyAuth, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(auth.0);
    next.run(request).await
}

/// A logged-in web user and their session id.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub session_id: String,
    pub user: User,
}

impl<D: Database + 'static> FromRequestParts<AppState<D>> for SessionUser {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<D>,
    ) -> Result<Self, Self::Rejection> {
        let to_login = || Redirect::to(LOGIN_PATH);

        let session_id = session_id_from_headers(&parts.headers).ok_or_else(to_login)?;
        let session = state.sessions().get(&session_id).ok_or_else(to_login)?;
        let user_id = session.user_id.ok_or_else(to_login)?;

        if let Some(tokens) = session.tokens.filter(|t| t.is_expired(Utc::now())) {
            // One refresh attempt; any failure ends the session
            let refreshed = match (tokens.refresh_token.as_deref(), state.oauth()) {
                (Some(refresh_token), Some(client)) => client.refresh(refresh_token).await.ok(),
                _ => None,
            };
            match refreshed {
                Some(new_tokens) => {
                    debug!(user_id, "Refreshed OAuth tokens");
                    state
                        .sessions()
                        .update(&session_id, |s| s.tokens = Some(new_tokens));
                }
                None => {
                    warn!(user_id, "OAuth token refresh failed, ending session");
                    state.sessions().destroy(&session_id);
                    return Err(to_login());
                }
            }
        }

        let user = match state.db().users().get(user_id).await {
            Ok(user) => user,
            Err(e) => {
                warn!(user_id, "Session user could not be loaded: {}", e);
                state.sessions().destroy(&session_id);
                return Err(to_login());
            }
        };

        Ok(SessionUser { session_id, user })
    }
}
