// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pushup endpoints.

use crate::error::Result;
use crate::models::Pushup;
use crate::routes::{validation_error, ListQuery};
use crate::time_utils::{now_local, parse_date_input};
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/pushups", get(list_pushups).post(create_pushup))
}

/// Body of `POST /pushups`.
#[derive(Debug, Deserialize, Validate)]
pub struct NewPushupRequest {
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub count: i64,
    pub date: Option<String>,
}

#[derive(Serialize)]
pub struct PushupCreatedResponse {
    pub message: String,
    pub pushup: Pushup,
}

async fn list_pushups(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<Pushup>>> {
    let pushups = state
        .store
        .get_pushups(params.range()?, Some(params.limit()?))
        .await?;
    Ok(Json(pushups))
}

async fn create_pushup(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewPushupRequest>,
) -> Result<(StatusCode, Json<PushupCreatedResponse>)> {
    let date = match body.date.as_deref().filter(|d| !d.trim().is_empty()) {
        Some(raw) => parse_date_input(raw)?,
        None => now_local(),
    };
    body.validate().map_err(validation_error)?;

    let pushup = state
        .store
        .create_pushup(Pushup::new(date, body.count)?)
        .await?;
    tracing::info!(count = pushup.count(), "Pushups logged via API");

    Ok((
        StatusCode::CREATED,
        Json(PushupCreatedResponse {
            message: "Pushup entry created successfully".to_string(),
            pushup,
        }),
    ))
}
