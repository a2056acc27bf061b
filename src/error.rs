use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced to the caller of a bookmark or interaction action.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("sign in required")]
    AuthRequired,

    #[error("permission denied")]
    PermissionDenied,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    /// Malformed import file.
    #[error("invalid bookmark file: {0}")]
    Parse(String),

    /// Store failure, message passed through as-is.
    #[error("{0}")]
    RemoteStore(String),

    #[error("metadata fetch failed: {0}")]
    Metadata(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        use AppError::*;
        match self {
            AuthRequired | InvalidCredentials => StatusCode::UNAUTHORIZED,
            PermissionDenied => StatusCode::FORBIDDEN,
            NotFound => StatusCode::NOT_FOUND,
            Validation(_) | Parse(_) => StatusCode::BAD_REQUEST,
            RemoteStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Metadata(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::RemoteStore(format!("{:#}", error))
    }
}

impl From<libsql::Error> for AppError {
    fn from(error: libsql::Error) -> Self {
        AppError::RemoteStore(error.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::info!(error = %self, status = status.as_u16(), "request rejected");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
