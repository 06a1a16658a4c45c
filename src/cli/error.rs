use miette::Diagnostic;
use thiserror::Error;

use crate::api::ApiError as ServerError;
use crate::auth::AuthError;
use crate::db::DbError;

#[derive(Error, Diagnostic, Debug)]
pub enum CliError {
    #[error("Failed to connect to API server")]
    #[diagnostic(
        code(svcmap::cli::connection_failed),
        help(
            "Is the server running? Try: svcmap serve\nOr set SVCMAP_API_URL to point to the correct server."
        )
    )]
    ConnectionFailed {
        #[source]
        source: reqwest::Error,
    },

    #[error("No API key given")]
    #[diagnostic(
        code(svcmap::cli::missing_api_key),
        help("Create one with `svcmap key create <name>` and pass it via --api-key or SVCMAP_API_KEY.")
    )]
    MissingApiKey,

    #[error("Invalid response from API server: {message}")]
    #[diagnostic(
        code(svcmap::cli::invalid_response),
        help(
            "The server returned data in an unexpected format. This might indicate a version mismatch."
        )
    )]
    InvalidResponse { message: String },

    #[error("API error ({status}): {message}")]
    #[diagnostic(code(svcmap::cli::api_error))]
    ApiError { status: u16, message: String },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(svcmap::cli::config))]
    Config { message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Server(#[from] ServerError),

    #[error("I/O error: {0}")]
    #[diagnostic(code(svcmap::cli::io))]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for CliError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            CliError::ConnectionFailed { source: e }
        } else {
            CliError::InvalidResponse {
                message: e.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::InvalidResponse {
            message: e.to_string(),
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
