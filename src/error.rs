use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

pub type Result<T> = std::result::Result<T, AppError>;

/// One entry in a validation failure's `details` array.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No verified identity on the request.
    #[error("{0}")]
    Unauthorized(String),

    /// Identity verified but the actor's role does not allow the operation.
    #[error("{0}")]
    Forbidden(String),

    /// Malformed input; carries per-field detail.
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    /// Uniqueness violation (e.g. duplicate slug).
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// Semantically disallowed, e.g. deleting the default workspace.
    #[error("{0}")]
    InvalidOperation(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn unauthorized() -> Self {
        AppError::Unauthorized("Unauthorized".into())
    }

    pub fn validation(path: &str, message: &str) -> Self {
        AppError::Validation(vec![FieldError::new(path, message)])
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Validation(_)
            | AppError::Conflict(_)
            | AppError::InvalidOperation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Storage(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, status = %status, "request rejected");
        }

        let body = match &self {
            AppError::Validation(details) => serde_json::json!({
                "error": "Validation failed",
                "details": details,
            }),
            // Internal details stay out of responses.
            AppError::Database(_) | AppError::Pool(_) | AppError::Internal(_) => {
                serde_json::json!({ "error": "Internal server error" })
            }
            AppError::Storage(msg) => serde_json::json!({ "error": msg }),
            other => serde_json::json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
