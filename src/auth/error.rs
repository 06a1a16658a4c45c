//! Authentication error types.

use miette::Diagnostic;
use thiserror::Error;

use crate::db::DbError;

#[derive(Error, Diagnostic, Debug)]
pub enum AuthError {
    #[error("Missing or malformed bearer token")]
    #[diagnostic(code(svcmap::auth::missing_token))]
    MissingToken,

    #[error("Invalid API key")]
    #[diagnostic(code(svcmap::auth::invalid_key))]
    InvalidKey,

    #[error("API key has expired")]
    #[diagnostic(
        code(svcmap::auth::expired_key),
        help("Create a new key under Settings")
    )]
    ExpiredKey,

    #[error("Failed to hash API key: {message}")]
    #[diagnostic(code(svcmap::auth::hash))]
    Hash { message: String },

    #[error("OAuth state mismatch")]
    #[diagnostic(code(svcmap::auth::state_mismatch))]
    StateMismatch,

    #[error("OAuth provider error: {message}")]
    #[diagnostic(code(svcmap::auth::provider))]
    Provider { message: String },

    #[error("OAuth request failed: {message}")]
    #[diagnostic(code(svcmap::auth::http))]
    Http { message: String },

    #[error("OAuth is not configured")]
    #[diagnostic(
        code(svcmap::auth::not_configured),
        help("Set SVCMAP_OAUTH_CLIENT_ID and the provider URLs")
    )]
    NotConfigured,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DbError),
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::Http {
            message: e.to_string(),
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
