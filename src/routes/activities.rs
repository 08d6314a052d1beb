// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Aggregate endpoints: activity status and run report.

use crate::db::MAX_DAYS;
use crate::error::{AppError, Result};
use crate::models::{ActivityStats, RunReport};
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_STATUS_DAYS: u32 = 30;
const DEFAULT_REPORT_DAYS: u32 = 7;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/activities/status", get(get_status))
        .route("/activities/report", get(get_report))
}

#[derive(Deserialize)]
struct DaysQuery {
    days: Option<u32>,
}

impl DaysQuery {
    fn days_or(&self, default: u32) -> Result<u32> {
        match self.days {
            None => Ok(default),
            Some(days) if (1..=MAX_DAYS).contains(&days) => Ok(days),
            Some(days) => Err(AppError::BadRequest(format!(
                "'days' must be between 1 and {}, got {}",
                MAX_DAYS, days
            ))),
        }
    }
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub message: String,
    pub stats: ActivityStats,
}

#[derive(Serialize)]
pub struct ReportResponse {
    pub message: String,
    pub report: RunReport,
}

async fn get_status(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DaysQuery>,
) -> Result<Json<StatusResponse>> {
    let days = params.days_or(DEFAULT_STATUS_DAYS)?;
    let stats = state.store.get_stats(days).await?;

    Ok(Json(StatusResponse {
        message: "Activity status retrieved successfully".to_string(),
        stats,
    }))
}

async fn get_report(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DaysQuery>,
) -> Result<Json<ReportResponse>> {
    let days = params.days_or(DEFAULT_REPORT_DAYS)?;
    let report = state.store.get_report(days).await?;

    Ok(Json(ReportResponse {
        message: "Run report retrieved successfully".to_string(),
        report,
    }))
}
