// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types rendered as callable-protocol error envelopes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Message returned to callers that lack the `admin` claim.
pub const ADMIN_ONLY_MESSAGE: &str = "Admin only access!";

/// Message returned for payloads that fail validation.
pub const INVALID_PAYLOAD_MESSAGE: &str = "Please pass valid payload!";

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Identity service error: {0}")]
    Identity(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Report error: {0}")]
    Report(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Permission error for admin-only handlers.
    pub fn admin_only() -> Self {
        AppError::PermissionDenied(ADMIN_ONLY_MESSAGE.to_string())
    }

    /// Generic invalid payload error.
    pub fn invalid_payload() -> Self {
        AppError::InvalidArgument(INVALID_PAYLOAD_MESSAGE.to_string())
    }

    /// Canonical callable status code for this error.
    pub fn status_code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated | AppError::InvalidToken => "UNAUTHENTICATED",
            AppError::PermissionDenied(_) => "PERMISSION_DENIED",
            AppError::InvalidArgument(_) => "INVALID_ARGUMENT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Database(_)
            | AppError::Identity(_)
            | AppError::Storage(_)
            | AppError::Report(_)
            | AppError::Internal(_) => "INTERNAL",
        }
    }
}

/// Callable error envelope: `{"error": {"status": ..., "message": ...}}`.
#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (http_status, message) = match &self {
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::PermissionDenied(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::InvalidArgument(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL".to_string())
            }
            AppError::Identity(msg) => {
                tracing::error!(error = %msg, "Identity service error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL".to_string())
            }
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL".to_string())
            }
            AppError::Report(msg) => {
                tracing::error!(error = %msg, "Report generation error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL".to_string())
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL".to_string())
            }
        };

        let body = ErrorEnvelope {
            error: ErrorBody {
                status: self.status_code(),
                message,
            },
        };

        (http_status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
