//! Page documents and flash-and-redirect helpers.

use axum::Json;
use axum::http::{HeaderMap, Uri, header::REFERER};
use axum::response::{IntoResponse, Redirect, Response};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::api::{ApiError, AppState};
use crate::auth::session::{Flash, FlashKind};
use crate::db::Database;

/// A rendered page: the front-end component to mount and its props.
#[derive(Debug, Serialize)]
pub struct Page {
    pub component: String,
    pub props: Value,
    pub url: String,
    pub flash: Vec<Flash>,
}

/// Render `component` with `props`, consuming pending flash messages.
pub fn render<D: Database>(
    state: &AppState<D>,
    session_id: &str,
    component: &str,
    uri: &Uri,
    props: impl Serialize,
) -> Result<Response, ApiError> {
    let props = serde_json::to_value(props).map_err(|e| ApiError::Internal(e.to_string()))?;
    let page = Page {
        component: component.to_string(),
        props,
        url: uri
            .path_and_query()
            .map(|p| p.to_string())
            .unwrap_or_else(|| uri.path().to_string()),
        flash: state.sessions().take_flash(session_id),
    };
    Ok(Json(page).into_response())
}

/// Path of the `Referer` header, or `fallback`.
///
/// Only the path and query are kept so a forged header cannot redirect
/// off-site.
pub fn back(headers: &HeaderMap, fallback: &str) -> String {
    headers
        .get(REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<Uri>().ok())
        .and_then(|uri| uri.path_and_query().map(|p| p.to_string()))
        .filter(|p| p.starts_with('/') && !p.starts_with("//"))
        .unwrap_or_else(|| fallback.to_string())
}

pub fn flash_redirect<D: Database>(
    state: &AppState<D>,
    session_id: &str,
    kind: FlashKind,
    message: impl Into<String>,
    to: &str,
) -> Response {
    state.sessions().flash(session_id, kind, message);
    Redirect::to(to).into_response()
}

/// Flash the outcome of a form action and redirect.
///
/// Success goes to `ok_to`; failures flash the error text and go to `err_to`.
pub fn finish<D: Database, T>(
    state: &AppState<D>,
    session_id: &str,
    result: Result<T, ApiError>,
    ok: impl FnOnce(T) -> (String, String),
    err_to: &str,
) -> Response {
    match result {
        Ok(value) => {
            let (message, to) = ok(value);
            flash_redirect(state, session_id, FlashKind::Success, message, &to)
        }
        Err(e) => {
            if e.status().is_server_error() {
                error!("Form action failed: {}", e);
            } else {
                warn!("Form action rejected: {}", e);
            }
            flash_redirect(state, session_id, FlashKind::Error, e.to_string(), err_to)
        }
    }
}
