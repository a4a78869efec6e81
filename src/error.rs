use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::services::membership::JoinRejection;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
    #[error(transparent)]
    Join(#[from] JoinRejection),
    #[error("join request has already been decided")]
    InvalidTransition,
    #[error("{detail}")]
    BadRequest { code: &'static str, detail: String },
    #[error("not found")]
    NotFound,
    #[error("authentication credentials were not provided or are invalid")]
    Unauthorized,
    #[error("you do not have permission to perform this action")]
    Forbidden,
}

impl AppError {
    pub fn bad_request(code: &'static str, detail: impl Into<String>) -> Self {
        AppError::BadRequest {
            code,
            detail: detail.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_)
            | AppError::Io(_)
            | AppError::Database(_)
            | AppError::Migrate(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Join(_) | AppError::InvalidTransition | AppError::BadRequest { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    /// Machine-readable reason code sent to clients alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_)
            | AppError::Io(_)
            | AppError::Database(_)
            | AppError::Migrate(_)
            | AppError::Other(_) => "InternalError",
            AppError::Join(rejection) => rejection.code(),
            AppError::InvalidTransition => "InvalidTransition",
            AppError::BadRequest { code, .. } => code,
            AppError::NotFound => "NotFound",
            AppError::Unauthorized => "Unauthorized",
            AppError::Forbidden => "Forbidden",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = if status.is_server_error() {
            error!(error = ?self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (
            status,
            Json(json!({ "error": self.code(), "detail": detail })),
        )
            .into_response()
    }
}
