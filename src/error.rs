// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.
//!
//! Every layer reports failures through [`AppError`]. Callers dispatch on the
//! variant; the message text is only an attached detail.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A value violated a domain constraint (non-positive distance, ...).
    #[error("Invalid {field}: {detail}")]
    Validation { field: &'static str, detail: String },

    /// Input could not be parsed at all (bad date or duration format).
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Authentication required")]
    Unauthorized,

    /// The storage engine could not run the operation.
    #[error("Storage unavailable during {operation}: {detail}")]
    StorageUnavailable {
        operation: &'static str,
        detail: String,
    },

    /// A third-party service (Smashrun, S3, a remote fitlog API) failed.
    #[error("{service} request failed: {detail}")]
    Upstream {
        service: &'static str,
        status: Option<u16>,
        detail: String,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a validation error for a named field.
    pub fn validation(field: &'static str, detail: impl Into<String>) -> Self {
        Self::Validation {
            field,
            detail: detail.into(),
        }
    }

    /// Create a storage error for the named operation.
    pub fn storage(operation: &'static str, detail: impl ToString) -> Self {
        Self::StorageUnavailable {
            operation,
            detail: detail.to_string(),
        }
    }

    /// Create an upstream error without an HTTP status (connection failures).
    pub fn upstream(service: &'static str, detail: impl ToString) -> Self {
        Self::Upstream {
            service,
            status: None,
            detail: detail.to_string(),
        }
    }

    /// HTTP status reported by the upstream service, if any.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            AppError::Upstream { status, .. } => *status,
            _ => None,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Validation { field, detail } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                Some(format!("{}: {}", field, detail)),
            ),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::StorageUnavailable { operation, detail } => {
                tracing::error!(operation = %operation, error = %detail, "Storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None)
            }
            AppError::Upstream {
                service,
                status,
                detail,
            } => {
                tracing::error!(service = %service, status = ?status, error = %detail, "Upstream error");
                (StatusCode::BAD_GATEWAY, "upstream_error", Some(detail.clone()))
            }
            AppError::Config(err) => {
                tracing::error!(error = %err, "Server misconfigured");
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_status() {
        let response = AppError::validation("distance", "must be positive").into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_bad_request_status() {
        let response = AppError::BadRequest("bad duration".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upstream_keeps_status() {
        let err = AppError::Upstream {
            service: "smashrun",
            status: Some(401),
            detail: "unauthorized".to_string(),
        };
        assert_eq!(err.upstream_status(), Some(401));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_config_error_is_server_error() {
        let err: AppError = ConfigError::Missing("FITLOG_API_KEY").into();
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
