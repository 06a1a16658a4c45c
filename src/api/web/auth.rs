//! OAuth login, callback and logout.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, Uri, header::SET_COOKIE};
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use super::page::{flash_redirect, render};
use crate::api::extract::LOGIN_PATH;
use crate::api::{AppState, ErrorResponse};
use crate::auth::oauth::{OAuthClient, OAuthTokens};
use crate::auth::session::{
    FlashKind, clear_session_cookie, session_cookie, session_id_from_headers,
};
use crate::auth::{AuthError, AuthResult, random_token};
use crate::db::{Database, User, UserRepository};

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

fn not_configured() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse {
            success: false,
            error: AuthError::NotConfigured.to_string(),
        }),
    )
        .into_response()
}

/// The current session id, or a fresh session when the cookie is absent or stale.
fn ensure_session<D: Database>(state: &AppState<D>, headers: &HeaderMap) -> (String, bool) {
    match session_id_from_headers(headers).filter(|id| state.sessions().get(id).is_some()) {
        Some(id) => (id, false),
        None => (state.sessions().create(), true),
    }
}

fn with_cookie<D: Database>(
    state: &AppState<D>,
    session_id: &str,
    created: bool,
    response: Response,
) -> Response {
    if created {
        ([(SET_COOKIE, session_cookie(session_id, state.secure_cookies()))], response)
            .into_response()
    } else {
        response
    }
}

/// `GET /auth/login`
///
/// Redirects to the provider. When a previous attempt left error messages,
/// renders the login page instead so they can be shown.
#[instrument(skip(state, headers))]
pub async fn login<D: Database>(
    State(state): State<AppState<D>>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let Some(client) = state.oauth() else {
        return not_configured();
    };

    let (session_id, created) = ensure_session(&state, &headers);
    let session = state.sessions().get(&session_id).unwrap_or_default();
    if session.user_id.is_some() {
        return Redirect::to("/").into_response();
    }

    let csrf = random_token();
    let authorize_url = match client.authorize_url(&csrf) {
        Ok(url) => url,
        Err(e) => {
            warn!("Cannot build authorize URL: {}", e);
            return not_configured();
        }
    };
    state
        .sessions()
        .update(&session_id, |s| s.oauth_state = Some(csrf));

    let response = if session.flash.is_empty() {
        Redirect::to(&authorize_url).into_response()
    } else {
        render(
            &state,
            &session_id,
            "auth/login",
            &uri,
            json!({ "authorize_url": authorize_url }),
        )
        .unwrap_or_else(IntoResponse::into_response)
    };
    with_cookie(&state, &session_id, created, response)
}

async fn complete_login<D: Database>(
    client: &OAuthClient,
    db: &D,
    code: &str,
) -> AuthResult<(User, OAuthTokens)> {
    let tokens = client.exchange_code(code).await?;
    let profile = client.fetch_user(&tokens.access_token).await?;
    let user = db.users().upsert(&profile).await?;
    Ok((user, tokens))
}

/// `GET /auth/callback`
#[instrument(skip(state, headers, query))]
pub async fn callback<D: Database>(
    State(state): State<AppState<D>>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(client) = state.oauth() else {
        return not_configured();
    };

    let (session_id, created) = ensure_session(&state, &headers);
    let fail = |message: String| {
        warn!("Login failed: {}", message);
        let response = flash_redirect(&state, &session_id, FlashKind::Error, message, LOGIN_PATH);
        with_cookie(&state, &session_id, created, response)
    };

    if let Some(error) = query.error {
        return fail(format!(
            "Login failed: {}",
            query.error_description.unwrap_or(error)
        ));
    }

    let expected = state.sessions().get(&session_id).and_then(|s| s.oauth_state);
    match (&expected, &query.state) {
        (Some(expected), Some(got)) if expected == got => {}
        _ => return fail(AuthError::StateMismatch.to_string()),
    }
    state.sessions().update(&session_id, |s| s.oauth_state = None);

    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return fail("Login failed: no authorization code".to_string());
    };

    let (user, tokens) = match complete_login(client, state.db(), &code).await {
        Ok(done) => done,
        Err(e) => return fail(format!("Login failed: {}", e)),
    };

    // New id on login; the pre-login session is discarded
    state.sessions().destroy(&session_id);
    let new_id = state.sessions().create();
    state.sessions().update(&new_id, |s| {
        s.user_id = Some(user.id);
        s.tokens = Some(tokens);
    });
    let greeting = match &user.full_name {
        Some(name) => format!("Welcome, {}", name),
        None => "Welcome".to_string(),
    };
    state.sessions().flash(&new_id, FlashKind::Success, greeting);
    info!(user_id = user.id, "User logged in");

    (
        [(SET_COOKIE, session_cookie(&new_id, state.secure_cookies()))],
        Redirect::to("/"),
    )
        .into_response()
}

/// `GET|POST /logout`
#[instrument(skip(state, headers))]
pub async fn logout<D: Database>(
    State(state): State<AppState<D>>,
    headers: HeaderMap,
) -> Response {
    if let Some(session_id) = session_id_from_headers(&headers) {
        state.sessions().destroy(&session_id);
    }
    (
        [(SET_COOKIE, clear_session_cookie(state.secure_cookies()))],
        Redirect::to(LOGIN_PATH),
    )
        .into_response()
}
