use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    Conflict(String),
    RateLimited(String),
    /// Field-level input or cross-entity constraint failure.
    Validation {
        field: &'static str,
        code: &'static str,
        message: String,
    },
    /// Business-state conflict with a stable machine-readable code.
    StateConflict {
        code: &'static str,
        message: String,
    },
    Internal(String),
    Database(sqlx::Error),
}

impl AppError {
    pub fn validation(field: &'static str, code: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field,
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not Found: {msg}"),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            AppError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            AppError::RateLimited(msg) => write!(f, "Rate Limited: {msg}"),
            AppError::Validation { field, code, message } => {
                write!(f, "Validation Error ({field}, {code}): {message}")
            }
            AppError::StateConflict { code, message } => {
                write!(f, "State Conflict ({code}): {message}")
            }
            AppError::Internal(msg) => write!(f, "Internal Error: {msg}"),
            AppError::Database(err) => write!(f, "Database Error: {err}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, json!({ "error": msg })),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            AppError::RateLimited(msg) => {
                (StatusCode::TOO_MANY_REQUESTS, json!({ "error": msg }))
            }
            AppError::Validation { field, code, message } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": message, "code": code, "field": field }),
            ),
            AppError::StateConflict { code, message } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": message, "code": code }),
            ),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
            AppError::Database(err) => {
                tracing::error!("Database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err)
    }
}

/// True when the error is a Postgres unique-constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
