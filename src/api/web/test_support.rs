//! Fixtures for session-authenticated page tests.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use axum::response::Response;
use serde_json::Value;
use tempfile::TempDir;

use crate::api::{AppState, routes};
use crate::auth::oauth::{OAuthClient, OAuthConfig};
use crate::auth::session::{Flash, SESSION_COOKIE};
use crate::db::testing::setup_db;
use crate::db::{Database, SqliteDatabase, User, UserProfile, UserRepository};

pub(crate) struct WebApp {
    pub router: Router,
    pub state: AppState<SqliteDatabase>,
    pub uploads: TempDir,
}

impl WebApp {
    pub fn db(&self) -> &SqliteDatabase {
        self.state.db()
    }

    /// A session already logged in as a fresh user.
    pub async fn login(&self) -> (String, User) {
        let user = self
            .db()
            .users()
            .upsert(&UserProfile {
                oauth_id: "user-1".to_string(),
                email: Some("ada@example.com".to_string()),
                full_name: Some("Ada".to_string()),
                avatar_url: None,
            })
            .await
            .expect("Failed to create user");
        let session_id = self.state.sessions().create();
        self.state
            .sessions()
            .update(&session_id, |s| s.user_id = Some(user.id));
        (session_id, user)
    }

    pub fn flashes(&self, session_id: &str) -> Vec<Flash> {
        self.state.sessions().take_flash(session_id)
    }
}

async fn build(oauth: Option<OAuthConfig>) -> WebApp {
    crate::init_crypto();
    let uploads = TempDir::new().expect("Failed to create upload dir");
    let db = setup_db().await;
    let mut state = AppState::new(db, uploads.path().to_path_buf());
    if let Some(config) = oauth {
        state = state.with_oauth(OAuthClient::new(config));
    }
    let router = routes::create_router(state.clone(), false);
    WebApp {
        router,
        state,
        uploads,
    }
}

/// App without an OAuth provider.
pub(crate) async fn web_app() -> WebApp {
    build(None).await
}

pub(crate) async fn web_app_with_oauth(config: OAuthConfig) -> WebApp {
    build(Some(config)).await
}

pub(crate) fn cookie(session_id: &str) -> String {
    format!("{}={}", SESSION_COOKIE, session_id)
}

pub(crate) fn page_request(method: &str, uri: &str, session_id: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie(session_id))
        .body(Body::empty())
        .unwrap()
}

/// A form action posting JSON, as the front end does.
pub(crate) fn form_request(
    method: &str,
    uri: &str,
    session_id: &str,
    referer: Option<&str>,
    body: &Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie(session_id))
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(referer) = referer {
        builder = builder.header(header::REFERER, referer);
    }
    builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub(crate) fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// The session id set by a `Set-Cookie` header, if any.
pub(crate) fn set_cookie_session(response: &Response) -> Option<String> {
    let value = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    let (pair, _) = value.split_once(';')?;
    let (name, id) = pair.split_once('=')?;
    (name == SESSION_COOKIE && !id.is_empty()).then(|| id.to_string())
}
