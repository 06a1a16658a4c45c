//! API error type and its HTTP mapping.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use miette::Diagnostic;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

use crate::auth::AuthError;
use crate::db::DbError;

/// Error body returned by every API route.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always false
    #[schema(example = false)]
    pub success: bool,
    #[schema(example = "Server '12' not found")]
    pub error: String,
}

#[derive(Error, Diagnostic, Debug)]
pub enum ApiError {
    #[error("{0}")]
    #[diagnostic(code(svcmap::api::validation))]
    Validation(String),

    #[error("{0}")]
    #[diagnostic(code(svcmap::api::unauthorized))]
    Unauthorized(String),

    #[error("{0}")]
    #[diagnostic(code(svcmap::api::not_found))]
    NotFound(String),

    #[error("{0}")]
    #[diagnostic(code(svcmap::api::conflict))]
    Conflict(String),

    #[error("{0}")]
    #[diagnostic(code(svcmap::api::internal))]
    Internal(String),

    #[error("Server error: {0}")]
    #[diagnostic(code(svcmap::api::server))]
    Server(#[from] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) | ApiError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (
            status,
            Json(ErrorResponse {
                success: false,
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { entity_type, id } => {
                ApiError::NotFound(format!("{} '{}' not found", entity_type, id))
            }
            DbError::AlreadyExists { .. } => ApiError::Conflict(e.to_string()),
            DbError::Validation { message } => ApiError::Validation(message),
            DbError::Constraint { message } => {
                ApiError::Validation(format!("Referenced record does not exist ({})", message))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingToken
            | AuthError::InvalidKey
            | AuthError::ExpiredKey
            | AuthError::StateMismatch => ApiError::Unauthorized(e.to_string()),
            AuthError::Database(db) => db.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<serde_valid::validation::Errors> for ApiError {
    fn from(errors: serde_valid::validation::Errors) -> Self {
        ApiError::Validation(validation_message(&errors))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

/// Flatten serde_valid errors into `field: message` pairs joined by `; `.
pub fn validation_message(errors: &serde_valid::validation::Errors) -> String {
    let mut messages = vec![];
    match serde_json::to_value(errors) {
        Ok(value) => collect_messages("", &value, &mut messages),
        Err(_) => messages.push(errors.to_string()),
    }
    if messages.is_empty() {
        "Invalid input".to_string()
    } else {
        messages.join("; ")
    }
}

fn collect_messages(path: &str, value: &Value, out: &mut Vec<String>) {
    let Value::Object(map) = value else {
        return;
    };
    if let Some(Value::Array(errors)) = map.get("errors") {
        for error in errors.iter().filter_map(Value::as_str) {
            if path.is_empty() {
                out.push(error.to_string());
            } else {
                out.push(format!("{}: {}", path, error));
            }
        }
    }
    for key in ["properties", "items"] {
        if let Some(Value::Object(children)) = map.get(key) {
            for (name, child) in children {
                let child_path = if path.is_empty() {
                    name.clone()
                } else {
                    format!("{}.{}", path, name)
                };
                collect_messages(&child_path, child, out);
            }
        }
    }
}
