// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - clients for external HTTP services.

pub mod fitlog_api;
pub mod s3;
pub mod smashrun;

pub use fitlog_api::FitlogApiClient;
pub use s3::S3Client;
pub use smashrun::{ImportOutcome, SmashrunClient};

use crate::error::AppError;

/// Turn a non-success response into an upstream error.
///
/// JSON bodies in the `{"error", "details"}` shape contribute their details
/// text; anything else is passed through as-is.
pub(crate) async fn upstream_error(
    service: &'static str,
    response: reqwest::Response,
) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| {
            value
                .get("details")
                .or_else(|| value.get("error"))
                .and_then(|d| d.as_str())
                .map(str::to_string)
        })
        .unwrap_or(body);

    tracing::warn!(
        service,
        status = status.as_u16(),
        detail = %detail,
        "Upstream request failed"
    );

    AppError::Upstream {
        service,
        status: Some(status.as_u16()),
        detail: if detail.is_empty() {
            format!("HTTP {}", status)
        } else {
            detail
        },
    }
}
