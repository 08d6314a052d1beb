// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod activities;
pub mod pushups;
pub mod runs;

use crate::db::DateRange;
use crate::error::{AppError, Result};
use crate::middleware::auth::require_api_key;
use crate::time_utils::{now_local, parse_query_date};
use crate::AppState;
use axum::extract::State;
use axum::http::{header, HeaderName, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub const DEFAULT_LIST_LIMIT: u32 = 100;
pub const MAX_LIST_LIMIT: u32 = 1000;

/// Query parameters shared by the list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Inclusive start date (YYYY-MM-DD)
    pub start_date: Option<String>,
    /// Inclusive end date (YYYY-MM-DD)
    pub end_date: Option<String>,
    pub limit: Option<u32>,
}

impl ListQuery {
    pub fn range(&self) -> Result<DateRange> {
        let start = self
            .start_date
            .as_deref()
            .map(|raw| parse_query_date("start_date", raw))
            .transpose()?;
        let end = self
            .end_date
            .as_deref()
            .map(|raw| parse_query_date("end_date", raw))
            .transpose()?;

        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(AppError::BadRequest(
                    "'start_date' must not be after 'end_date'".to_string(),
                ));
            }
        }
        Ok(DateRange::between(start, end))
    }

    pub fn limit(&self) -> Result<u32> {
        match self.limit {
            None => Ok(DEFAULT_LIST_LIMIT),
            Some(limit) if (1..=MAX_LIST_LIMIT).contains(&limit) => Ok(limit),
            Some(limit) => Err(AppError::BadRequest(format!(
                "'limit' must be between 1 and {}, got {}",
                MAX_LIST_LIMIT, limit
            ))),
        }
    }
}

/// Map the first failed field of a request body to a validation error.
pub(crate) fn validation_error(errors: validator::ValidationErrors) -> AppError {
    let Some((field, failures)) = errors.field_errors().into_iter().next() else {
        return AppError::validation("body", "invalid request body");
    };

    let detail = failures
        .first()
        .and_then(|f| f.message.as_ref())
        .map(|m| m.to_string())
        .unwrap_or_else(|| "invalid value".to_string());

    let field: &'static str = match field.as_ref() {
        "distance" => "distance",
        "count" => "count",
        _ => "body",
    };
    AppError::validation(field, detail)
}

#[derive(Serialize)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
    pub status: String,
    pub storage: String,
    pub timestamp: String,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

/// API information.
async fn root(State(state): State<Arc<AppState>>) -> Json<RootResponse> {
    let endpoints = BTreeMap::from([
        ("runs", "/runs"),
        ("pushups", "/pushups"),
        ("activities", "/activities"),
        ("health", "/health"),
    ]);

    Json(RootResponse {
        message: "Fitlog Cloud API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "healthy".to_string(),
        storage: state.store.location(),
        timestamp: now_local().format("%Y-%m-%dT%H:%M:%S").to_string(),
        endpoints,
    })
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: now_local().format("%Y-%m-%dT%H:%M:%S").to_string(),
    })
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-api-key"),
        ]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check));

    // Protected routes (API key required)
    let protected_routes = Router::new()
        .merge(runs::routes())
        .merge(pushups::routes())
        .merge(activities::routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_defaults() {
        let query = ListQuery::default();
        assert_eq!(query.limit().unwrap(), DEFAULT_LIST_LIMIT);
        assert_eq!(query.range().unwrap(), DateRange::all());
    }

    #[test]
    fn test_list_query_rejects_bad_values() {
        let query = ListQuery {
            limit: Some(MAX_LIST_LIMIT + 1),
            ..Default::default()
        };
        assert!(matches!(query.limit(), Err(AppError::BadRequest(_))));

        let query = ListQuery {
            start_date: Some("2025-06-10".to_string()),
            end_date: Some("2025-06-01".to_string()),
            ..Default::default()
        };
        assert!(matches!(query.range(), Err(AppError::BadRequest(_))));

        let query = ListQuery {
            end_date: Some("06/01/25".to_string()),
            ..Default::default()
        };
        assert!(matches!(query.range(), Err(AppError::BadRequest(_))));
    }
}
