//! API error type and HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};

/// Errors a handler can surface to the client.
#[derive(Debug)]
pub enum ApiError {
    Internal(notedrop_core::Error),
    Unauthorized(String),
    NotFound(String),
    BadRequest(String),
}

impl From<notedrop_core::Error> for ApiError {
    fn from(err: notedrop_core::Error) -> Self {
        use notedrop_core::Error;
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::NoteNotFound(id) => ApiError::NotFound(format!("Note not found: {}", id)),
            Error::DocNodeNotFound(id) => {
                ApiError::NotFound(format!("Doc node not found: {}", id))
            }
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            other => ApiError::Internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
