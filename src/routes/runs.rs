// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Run endpoints.

use crate::error::{AppError, Result};
use crate::models::{ElapsedTime, Run};
use crate::routes::{validation_error, ListQuery};
use crate::time_utils::{now_local, parse_date_input};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Run routes (require an API key).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/runs", get(list_runs).post(create_run))
        .route("/runs/{activity_id}", get(get_run))
}

/// Body of `POST /runs`.
#[derive(Debug, Deserialize, Validate)]
pub struct NewRunRequest {
    /// HH:MM:SS
    pub duration: String,
    /// Miles
    #[validate(range(exclusive_min = 0.0, message = "must be greater than 0"))]
    pub distance: f64,
    /// MM/DD/YY, YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS; defaults to now.
    pub date: Option<String>,
}

#[derive(Serialize)]
pub struct RunCreatedResponse {
    pub message: String,
    pub run: Run,
}

async fn list_runs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<Run>>> {
    let range = params.range()?;
    let limit = params.limit()?;
    tracing::debug!(?range, limit, "Listing runs");

    let runs = state.store.get_runs(range, Some(limit)).await?;
    Ok(Json(runs))
}

async fn get_run(
    State(state): State<Arc<AppState>>,
    Path(activity_id): Path<i64>,
) -> Result<Json<Run>> {
    state
        .store
        .get_run(activity_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Run {} not found", activity_id)))
}

async fn create_run(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewRunRequest>,
) -> Result<(StatusCode, Json<RunCreatedResponse>)> {
    let duration: ElapsedTime = body.duration.parse()?;
    let date = match body.date.as_deref().filter(|d| !d.trim().is_empty()) {
        Some(raw) => parse_date_input(raw)?,
        None => now_local(),
    };
    body.validate().map_err(validation_error)?;

    let run = state
        .store
        .create_run(Run::new(date, duration, body.distance)?)
        .await?;

    tracing::info!(
        activity_id = ?run.activity_id,
        distance = run.distance_miles(),
        "Run logged via API"
    );

    Ok((
        StatusCode::CREATED,
        Json(RunCreatedResponse {
            message: "Run created successfully".to_string(),
            run,
        }),
    ))
}
