use tempfile::TempDir;
use tokio::net::TcpListener;

use crate::api::{AppState, routes};
use crate::auth::api_key;
use crate::cli::api_client::ApiClient;
use crate::db::SqliteDatabase;
use crate::db::testing::setup_db;

pub(crate) struct TestServer {
    pub client: ApiClient,
    pub state: AppState<SqliteDatabase>,
    pub url: String,
    _uploads: TempDir,
    _handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub fn db(&self) -> &SqliteDatabase {
        self.state.db()
    }
}

/// Spawn a test HTTP server with an in-memory database and a client holding a valid key
pub(crate) async fn spawn_test_server() -> TestServer {
    crate::init_crypto();
    let uploads = TempDir::new().expect("Failed to create upload dir");
    let state = AppState::new(setup_db().await, uploads.path().to_path_buf());
    let (_, key) = api_key::issue(state.db(), None, "cli-tests", None)
        .await
        .expect("Failed to issue API key");
    let app = routes::create_router(state.clone(), false);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let url = format!("http://{}", addr);

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        client: ApiClient::new(Some(url.clone()), Some(key)),
        state,
        url,
        _uploads: uploads,
        _handle: handle,
    }
}
