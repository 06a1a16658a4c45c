//! HTTP surface: REST API v1, web pages, MCP endpoint and uploads.

mod error;
pub mod extract;
pub mod routes;
mod state;
pub mod v1;
pub mod web;

#[cfg(test)]
mod mod_test;

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::auth::oauth::{OAuthClient, OAuthConfig};
use crate::db::Database;
use crate::paths;

pub use error::{ApiError, ErrorResponse, validation_message};
pub use state::AppState;

/// API server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host address to bind to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Verbosity level (0 = info, 1 = debug, 2+ = trace)
    pub verbosity: u8,
    /// Serve the OpenAPI document and Scalar UI
    pub enable_docs: bool,
    /// Where uploaded service icons are stored
    pub upload_dir: PathBuf,
    /// Mark the session cookie `Secure`
    pub secure_cookies: bool,
    /// Web login provider; web pages are unavailable without one
    pub oauth: Option<OAuthConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            verbosity: 0,
            enable_docs: false,
            upload_dir: paths::default_upload_dir(),
            secure_cookies: false,
            oauth: None,
        }
    }
}

/// Default filter directive for a verbosity level.
pub(crate) fn log_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "svcmap=info,tower_http=info",
        1 => "svcmap=debug,tower_http=debug",
        _ => "svcmap=trace,tower_http=trace",
    }
}

/// Initialize tracing subscriber with env filter
///
/// `RUST_LOG` takes precedence over the verbosity level.
fn init_tracing(verbosity: u8) {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| log_filter(verbosity).into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Run the API server with the given configuration
pub async fn run<D: Database + 'static>(config: Config, db: D) -> Result<(), ApiError> {
    init_tracing(config.verbosity);
    crate::init_crypto();

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let mut state = AppState::new(db, config.upload_dir.clone())
        .with_secure_cookies(config.secure_cookies);
    match config.oauth {
        Some(oauth) => state = state.with_oauth(OAuthClient::new(oauth)),
        None => info!("OAuth is not configured, web login is disabled"),
    }

    let app = routes::create_router(state, config.enable_docs);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("svcmap listening on http://{}", addr);
    if config.enable_docs {
        info!("API docs at http://{}/docs", addr);
    }

    axum::serve(listener, app).await?;
    Ok(())
}
