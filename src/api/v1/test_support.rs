//! Shared fixtures for router-level tests.

use axum::{
    Router,
    body::Body,
    http::{Request, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;

use crate::api::{AppState, routes};
use crate::auth::api_key;
use crate::db::SqliteDatabase;
use crate::db::testing::setup_db;

pub(crate) struct TestApp {
    pub router: Router,
    pub state: AppState<SqliteDatabase>,
    /// Plain bearer key accepted by the router
    pub key: String,
    _uploads: TempDir,
}

impl TestApp {
    pub fn db(&self) -> &SqliteDatabase {
        self.state.db()
    }
}

/// Router over an in-memory database with one issued API key.
pub(crate) async fn test_app() -> TestApp {
    let uploads = TempDir::new().expect("Failed to create upload dir");
    let db = setup_db().await;
    let state = AppState::new(db, uploads.path().to_path_buf());
    let (_, key) = api_key::issue(state.db(), None, "tests", None)
        .await
        .expect("Failed to issue API key");
    let router = routes::create_router(state.clone(), false);

    TestApp {
        router,
        state,
        key,
        _uploads: uploads,
    }
}

pub(crate) fn authed(method: &str, uri: &str, key: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", key))
        .body(Body::empty())
        .unwrap()
}

pub(crate) fn authed_json(method: &str, uri: &str, key: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", key))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// Helper to parse JSON response body
pub(crate) async fn json_body(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}
