// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API key authentication middleware.

use crate::config::ConfigError;
use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Header carrying the shared API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Middleware that requires the configured API key.
///
/// A server without a configured key refuses every protected request with a
/// configuration error rather than letting it through.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let expected = state
        .config
        .api_key
        .as_deref()
        .ok_or(ConfigError::Missing("FITLOG_API_KEY"))?;

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    if !bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        tracing::warn!(path = %request.uri().path(), "Rejected request with invalid API key");
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}
