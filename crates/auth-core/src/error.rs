//! Error types for authentication operations
//!
//! Every failure that can cross the HTTP boundary is one of these variants.
//! Persistence and cryptographic errors are wrapped here and rendered as a
//! generic 500 body; their details go to the log only.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    AlreadyExists(String),

    /// Uniform failure for unknown identifier and wrong password alike.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Token expired")]
    TokenExpired,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Refresh token is not in database!")]
    RefreshTokenNotFound,

    #[error("Refresh token was expired. Please make a new sign in request")]
    RefreshTokenExpired,

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::AlreadyExists(_) => StatusCode::CONFLICT,
            Error::InvalidCredentials
            | Error::TokenInvalid
            | Error::TokenExpired
            | Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            // Matches the original wire behavior: a bad refresh token is a 403.
            Error::RefreshTokenNotFound | Error::RefreshTokenExpired => StatusCode::FORBIDDEN,
            Error::Upload(_) => StatusCode::BAD_GATEWAY,
            Error::Config(_) | Error::Database(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short machine-readable kind for the error body.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::AlreadyExists(_) => "duplicate_resource",
            Error::InvalidCredentials => "invalid_credentials",
            Error::TokenInvalid => "token_invalid",
            Error::TokenExpired => "token_expired",
            Error::Unauthorized => "unauthorized",
            Error::Forbidden => "forbidden",
            Error::RefreshTokenNotFound => "refresh_token_not_found",
            Error::RefreshTokenExpired => "refresh_token_expired",
            Error::Upload(_) => "upstream_failure",
            Error::Config(_) | Error::Database(_) | Error::Internal(_) => "internal_error",
        }
    }

    /// Message safe to serialize to a client.
    fn public_message(&self) -> String {
        match self {
            Error::Config(_) | Error::Database(_) | Error::Internal(_) => {
                "Internal server error".to_string()
            }
            Error::Upload(_) => "Upload failed".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        let body = Json(json!({
            "status": status.as_u16(),
            "error": self.kind(),
            "message": self.public_message(),
        }));
        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Error::Validation(errors.to_string())
    }
}
