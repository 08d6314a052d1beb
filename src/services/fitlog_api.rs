// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client for a deployed fitlog REST API ("cloud mode").

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::db::DateRange;
use crate::error::AppError;
use crate::models::{ActivityStats, Pushup, PushupRecord, Run, RunRecord, RunReport};
use crate::routes::MAX_LIST_LIMIT;
use crate::services::upstream_error;

const SERVICE: &str = "fitlog-api";

#[derive(Serialize)]
struct NewRunBody {
    duration: String,
    distance: f64,
    date: String,
}

#[derive(Serialize)]
struct NewPushupBody {
    count: u32,
    date: String,
}

#[derive(Deserialize)]
struct RunCreated {
    run: RunRecord,
}

#[derive(Deserialize)]
struct PushupCreated {
    pushup: PushupRecord,
}

#[derive(Deserialize)]
struct StatsEnvelope {
    stats: ActivityStats,
}

#[derive(Deserialize)]
struct ReportEnvelope {
    report: RunReport,
}

/// fitlog REST API client authenticated with `X-API-Key`.
#[derive(Clone)]
pub struct FitlogApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

fn iso_datetime(date: &chrono::NaiveDateTime) -> String {
    date.format("%Y-%m-%dT%H:%M:%S").to_string()
}

fn range_query(range: &DateRange, limit: Option<u32>) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(start) = range.start {
        query.push(("start_date", start.format("%Y-%m-%d").to_string()));
    }
    if let Some(end) = range.end {
        query.push(("end_date", end.format("%Y-%m-%d").to_string()));
    }
    // An omitted limit gets the server's default; ask for its maximum instead.
    let limit = limit.unwrap_or(MAX_LIST_LIMIT);
    query.push(("limit", limit.to_string()));
    query
}

impl FitlogApiClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: std::time::Duration,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::upstream(SERVICE, e))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Build a client from cloud-mode settings.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let api_key = config.require_cloud_config()?;
        Self::new(
            &config.api_url,
            api_key,
            std::time::Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send<T: for<'de> Deserialize<'de>>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, AppError> {
        let response = request
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(upstream_error(SERVICE, response).await);
        }

        response
            .json()
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("JSON parse error: {}", e)))
    }

    /// Log a run. Only duration, distance and date are sent; the server
    /// assigns the id.
    pub async fn create_run(&self, run: &Run) -> Result<Run, AppError> {
        let body = NewRunBody {
            duration: run.duration().to_string(),
            distance: run.distance_miles(),
            date: iso_datetime(&run.date),
        };
        tracing::debug!(url = %self.base_url, distance = body.distance, "Posting run");

        let created: RunCreated = self
            .send(self.http.post(format!("{}/runs", self.base_url)).json(&body))
            .await?;
        created.run.into_run()
    }

    pub async fn create_pushup(&self, pushup: &Pushup) -> Result<Pushup, AppError> {
        let body = NewPushupBody {
            count: pushup.count(),
            date: iso_datetime(&pushup.date),
        };

        let created: PushupCreated = self
            .send(self.http.post(format!("{}/pushups", self.base_url)).json(&body))
            .await?;
        created.pushup.into_pushup()
    }

    pub async fn get_runs(
        &self,
        range: &DateRange,
        limit: Option<u32>,
    ) -> Result<Vec<Run>, AppError> {
        let records: Vec<RunRecord> = self
            .send(
                self.http
                    .get(format!("{}/runs", self.base_url))
                    .query(&range_query(range, limit)),
            )
            .await?;
        records.into_iter().map(RunRecord::into_run).collect()
    }

    pub async fn get_pushups(
        &self,
        range: &DateRange,
        limit: Option<u32>,
    ) -> Result<Vec<Pushup>, AppError> {
        let records: Vec<PushupRecord> = self
            .send(
                self.http
                    .get(format!("{}/pushups", self.base_url))
                    .query(&range_query(range, limit)),
            )
            .await?;
        records.into_iter().map(PushupRecord::into_pushup).collect()
    }

    pub async fn get_stats(&self, days: u32) -> Result<ActivityStats, AppError> {
        let envelope: StatsEnvelope = self
            .send(
                self.http
                    .get(format!("{}/activities/status", self.base_url))
                    .query(&[("days", days)]),
            )
            .await?;
        Ok(envelope.stats)
    }

    pub async fn get_report(&self, days: u32) -> Result<RunReport, AppError> {
        let envelope: ReportEnvelope = self
            .send(
                self.http
                    .get(format!("{}/activities/report", self.base_url))
                    .query(&[("days", days)]),
            )
            .await?;
        Ok(envelope.report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_range_query() {
        let range = DateRange::between(NaiveDate::from_ymd_opt(2025, 6, 1), None);
        assert_eq!(
            range_query(&range, Some(10)),
            vec![
                ("start_date", "2025-06-01".to_string()),
                ("limit", "10".to_string())
            ]
        );
        assert_eq!(
            range_query(&DateRange::all(), None),
            vec![("limit", MAX_LIST_LIMIT.to_string())]
        );
    }

    #[test]
    fn test_from_config_requires_api_key() {
        let config = Config {
            api_key: None,
            ..Config::default()
        };
        assert!(matches!(
            FitlogApiClient::from_config(&config),
            Err(AppError::Config(_))
        ));
    }
}
