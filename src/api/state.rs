//! Application state for the HTTP server.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::auth::oauth::OAuthClient;
use crate::auth::session::SessionStore;
use crate::db::Database;

/// Shared application state.
///
/// Generic over `D: Database` so handlers never name a storage backend.
pub struct AppState<D: Database> {
    db: Arc<D>,
    sessions: Arc<SessionStore>,
    oauth: Option<Arc<OAuthClient>>,
    upload_dir: Arc<PathBuf>,
    secure_cookies: bool,
}

// Manual Clone impl - only the Arcs are cloned, D need not be Clone
impl<D: Database> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            sessions: Arc::clone(&self.sessions),
            oauth: self.oauth.clone(),
            upload_dir: Arc::clone(&self.upload_dir),
            secure_cookies: self.secure_cookies,
        }
    }
}

impl<D: Database> AppState<D> {
    /// State with no OAuth provider and uploads under `upload_dir`.
    pub fn new(db: D, upload_dir: PathBuf) -> Self {
        Self {
            db: Arc::new(db),
            sessions: Arc::new(SessionStore::new()),
            oauth: None,
            upload_dir: Arc::new(upload_dir),
            secure_cookies: false,
        }
    }

    pub fn with_oauth(mut self, client: OAuthClient) -> Self {
        self.oauth = Some(Arc::new(client));
        self
    }

    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    pub fn db(&self) -> &D {
        &self.db
    }

    /// The database handle, shared with services that outlive a request.
    pub fn shared_db(&self) -> Arc<D> {
        Arc::clone(&self.db)
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn oauth(&self) -> Option<&OAuthClient> {
        self.oauth.as_deref()
    }

    /// Directory holding uploaded service icons.
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }
}
