// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Smashrun API client for importing runs.
//!
//! Handles:
//! - Activity search over a date range
//! - Mapping activities to [`Run`]s, skipping malformed records
//! - Per-run split details
//! - One token refresh and retry when the access token is rejected
//! - The OAuth code exchange used for first-time setup

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::{update_env_file, Config, ConfigError};
use crate::error::AppError;
use crate::models::{ElapsedTime, Run, Split};
use crate::services::upstream_error;
use crate::time_utils::truncate_seconds;

pub const DEFAULT_API_BASE: &str = "https://api.smashrun.com/v1";
pub const DEFAULT_AUTH_BASE: &str = "https://secure.smashrun.com/oauth2";
/// Redirect target registered for the manual code flow.
pub const REDIRECT_URI: &str = "https://localhost:8080/callback";

const SERVICE: &str = "smashrun";
const KM_TO_MILES: f64 = 0.621371;
/// Refreshed tokens are assumed to last this long.
const REFRESHED_TOKEN_LIFETIME_WEEKS: i64 = 12;

/// Absolute expiry for a token granted `expires_in` seconds from now.
fn token_expiry(expires_in: Option<i64>) -> Option<DateTime<Utc>> {
    expires_in
        .and_then(Duration::try_seconds)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
}

/// Convert a Smashrun distance to miles.
///
/// Values above 1000 are taken to be meters, anything else kilometers.
pub fn distance_to_miles(distance: f64) -> f64 {
    let km = if distance > 1000.0 {
        distance / 1000.0
    } else {
        distance
    };
    km * KM_TO_MILES
}

/// Parse `startDateTimeLocal`, keeping the local wall-clock time.
pub fn parse_local_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_local())
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .map(truncate_seconds)
}

/// OAuth tokens currently in use.
#[derive(Debug, Clone, Default)]
pub struct SmashrunTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SmashrunTokens {
    /// Write the tokens into the env file, leaving other keys untouched.
    pub fn persist(&self, env_file: &std::path::Path) -> std::io::Result<()> {
        if let Some(access) = &self.access_token {
            update_env_file(env_file, "SMASHRUN_ACCESS_TOKEN", access)?;
        }
        if let Some(refresh) = &self.refresh_token {
            update_env_file(env_file, "SMASHRUN_REFRESH_TOKEN", refresh)?;
        }
        if let Some(expires) = self.expires_at {
            update_env_file(env_file, "SMASHRUN_TOKEN_EXPIRES", &expires.to_rfc3339())?;
        }
        Ok(())
    }
}

/// Runs fetched from Smashrun and how many records were returned.
#[derive(Debug, Default)]
pub struct ImportOutcome {
    pub runs: Vec<Run>,
    pub requested: usize,
}

impl ImportOutcome {
    /// Records that could not be turned into runs.
    pub fn skipped(&self) -> usize {
        self.requested.saturating_sub(self.runs.len())
    }
}

/// Activity summary from the search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SmashrunActivity {
    activity_id: Option<i64>,
    start_date_time_local: Option<String>,
    duration: Option<f64>,
    distance: Option<f64>,
    heart_rate_average: Option<f64>,
    heart_rate_max: Option<f64>,
    heart_rate_min: Option<f64>,
    cadence_average: Option<f64>,
    cadence_max: Option<f64>,
    cadence_min: Option<f64>,
    temperature: Option<f64>,
    weather_type: Option<String>,
    humidity: Option<f64>,
    wind_speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SmashrunDetail {
    #[serde(default)]
    splits: Vec<SmashrunSplit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SmashrunSplit {
    duration: Option<f64>,
    pace: Option<f64>,
    heart_rate: Option<f64>,
    cadence: Option<f64>,
}

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

fn round_metric(value: Option<f64>) -> Option<i32> {
    value
        .filter(|v| v.is_finite())
        .map(|v| v.round() as i32)
}

/// Map one search record to a run. The error is the reason it was skipped.
fn parse_activity(value: serde_json::Value) -> Result<Run, String> {
    let activity: SmashrunActivity =
        serde_json::from_value(value).map_err(|e| format!("unexpected record shape: {}", e))?;

    let local = activity
        .start_date_time_local
        .as_deref()
        .ok_or("missing startDateTimeLocal")?;
    let date = parse_local_timestamp(local)
        .ok_or_else(|| format!("unparseable startDateTimeLocal '{}'", local))?;
    let duration = activity
        .duration
        .filter(|d| *d > 0.0)
        .ok_or("missing duration")?;
    let distance = activity
        .distance
        .filter(|d| *d > 0.0)
        .ok_or("missing distance")?;

    let mut run = Run::new(
        date,
        ElapsedTime::from_secs_f64(duration),
        distance_to_miles(distance),
    )
    .map_err(|e| e.to_string())?;

    run.activity_id = activity.activity_id;
    run.heart_rate_avg = round_metric(activity.heart_rate_average);
    run.heart_rate_max = round_metric(activity.heart_rate_max);
    run.heart_rate_min = round_metric(activity.heart_rate_min);
    run.cadence_avg = round_metric(activity.cadence_average);
    run.cadence_max = round_metric(activity.cadence_max);
    run.cadence_min = round_metric(activity.cadence_min);
    run.temperature = activity.temperature;
    run.weather_type = activity.weather_type;
    run.humidity = activity.humidity;
    run.wind_speed = activity.wind_speed;
    Ok(run)
}

fn splits_from_detail(detail: SmashrunDetail) -> Result<Vec<Split>, AppError> {
    detail
        .splits
        .into_iter()
        .enumerate()
        .map(|(i, s)| {
            let mut split = Split::new(
                i as i64 + 1,
                ElapsedTime::from_secs_f64(s.duration.unwrap_or(0.0)),
                ElapsedTime::from_secs_f64(s.pace.unwrap_or(0.0)),
            )?;
            split.heart_rate_avg = round_metric(s.heart_rate);
            split.cadence_avg = round_metric(s.cadence);
            Ok(split)
        })
        .collect()
}

/// Smashrun API client.
pub struct SmashrunClient {
    http: reqwest::Client,
    api_base: String,
    auth_base: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    tokens: SmashrunTokens,
    refreshed: bool,
}

impl SmashrunClient {
    /// Create a client from the configured credentials.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::upstream(SERVICE, e))?;

        Ok(Self {
            http,
            api_base: DEFAULT_API_BASE.to_string(),
            auth_base: DEFAULT_AUTH_BASE.to_string(),
            client_id: config.smashrun.client_id.clone(),
            client_secret: config.smashrun.client_secret.clone(),
            tokens: SmashrunTokens {
                access_token: config.smashrun.access_token.clone(),
                refresh_token: config.smashrun.refresh_token.clone(),
                expires_at: None,
            },
            refreshed: false,
        })
    }

    /// Point the client at different API and OAuth hosts.
    pub fn with_base_urls(mut self, api_base: &str, auth_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self.auth_base = auth_base.trim_end_matches('/').to_string();
        self
    }

    pub fn tokens(&self) -> &SmashrunTokens {
        &self.tokens
    }

    /// Whether the tokens changed since the client was created.
    pub fn tokens_refreshed(&self) -> bool {
        self.refreshed
    }

    fn client_credentials(&self) -> Result<(&str, &str), ConfigError> {
        let id = self
            .client_id
            .as_deref()
            .ok_or(ConfigError::Missing("SMASHRUN_CLIENT_ID"))?;
        let secret = self
            .client_secret
            .as_deref()
            .ok_or(ConfigError::Missing("SMASHRUN_CLIENT_SECRET"))?;
        Ok((id, secret))
    }

    /// Fetch runs between `start` and `end`, with splits where available.
    ///
    /// Records missing required fields are skipped and counted, not raised.
    pub async fn get_runs(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ImportOutcome, AppError> {
        let url = format!("{}/my/activities/search", self.api_base);
        let query = [
            ("fromDateUTC", start.timestamp().to_string()),
            ("toDateUTC", end.timestamp().to_string()),
        ];

        tracing::info!(
            start = %start.format("%Y-%m-%d"),
            end = %end.format("%Y-%m-%d"),
            "Fetching runs from Smashrun"
        );

        let records: Vec<serde_json::Value> = self.get_json(&url, &query).await?;
        let requested = records.len();
        let mut runs = Vec::with_capacity(requested);

        for record in records {
            let mut run = match parse_activity(record) {
                Ok(run) => run,
                Err(reason) => {
                    tracing::warn!(reason = %reason, "Skipping Smashrun activity");
                    continue;
                }
            };

            if let Some(activity_id) = run.activity_id {
                match self.get_splits(activity_id).await {
                    Ok(splits) => {
                        if let Err(e) = run.set_splits(splits) {
                            tracing::warn!(activity_id, error = %e, "Ignoring invalid splits");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(activity_id, error = %e, "Could not fetch split data");
                    }
                }
            }
            runs.push(run);
        }

        tracing::info!(requested, imported = runs.len(), "Fetched Smashrun runs");
        Ok(ImportOutcome { runs, requested })
    }

    async fn get_splits(&mut self, activity_id: i64) -> Result<Vec<Split>, AppError> {
        let url = format!("{}/my/activities/{}", self.api_base, activity_id);
        let detail: SmashrunDetail = self.get_json(&url, &[]).await?;
        splits_from_detail(detail)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &mut self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let response = self.get_authorized(url, query).await?;
        response
            .json()
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("JSON parse error: {}", e)))
    }

    async fn send_get(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, AppError> {
        let token = self
            .tokens
            .access_token
            .as_deref()
            .ok_or(ConfigError::Missing("SMASHRUN_ACCESS_TOKEN"))?;

        self.http
            .get(url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e))
    }

    /// GET with the access token, refreshing it once on a 401.
    async fn get_authorized(
        &mut self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, AppError> {
        let response = self.send_get(url, query).await?;

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            let Some(refresh_token) = self.tokens.refresh_token.clone() else {
                return Err(upstream_error(SERVICE, response).await);
            };
            tracing::warn!("Smashrun access token rejected, refreshing");
            self.refresh(&refresh_token).await?;
            self.send_get(url, query).await?
        } else {
            response
        };

        if !response.status().is_success() {
            return Err(upstream_error(SERVICE, response).await);
        }
        Ok(response)
    }

    async fn post_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(format!("{}/token", self.auth_base))
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(upstream_error(SERVICE, response).await);
        }
        response
            .json()
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("JSON parse error: {}", e)))
    }

    async fn refresh(&mut self, refresh_token: &str) -> Result<(), AppError> {
        let (client_id, client_secret) = self.client_credentials()?;
        let token = self
            .post_token(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .await?;

        self.tokens.access_token = Some(token.access_token);
        if token.refresh_token.is_some() {
            self.tokens.refresh_token = token.refresh_token;
        }
        self.tokens.expires_at = token_expiry(token.expires_in)
            .or_else(|| Some(Utc::now() + Duration::weeks(REFRESHED_TOKEN_LIFETIME_WEEKS)));
        self.refreshed = true;

        tracing::info!("Refreshed Smashrun access token");
        Ok(())
    }

    /// Browser URL that starts the OAuth code flow.
    pub fn authorize_url(&self) -> Result<String, AppError> {
        let (client_id, _) = self.client_credentials()?;
        Ok(format!(
            "{}/authenticate?client_id={}&response_type=code&redirect_uri={}&scope=read_activity",
            self.auth_base,
            urlencoding::encode(client_id),
            urlencoding::encode(REDIRECT_URI)
        ))
    }

    /// Exchange an authorization code for tokens and keep them.
    pub async fn exchange_code(&mut self, code: &str) -> Result<&SmashrunTokens, AppError> {
        let (client_id, client_secret) = self.client_credentials()?;
        let token = self
            .post_token(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", REDIRECT_URI),
            ])
            .await?;

        self.tokens = SmashrunTokens {
            access_token: Some(token.access_token),
            refresh_token: token.refresh_token,
            expires_at: token_expiry(token.expires_in),
        };
        self.refreshed = true;
        Ok(&self.tokens)
    }
}
