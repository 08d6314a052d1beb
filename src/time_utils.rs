// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time parsing and formatting.

use crate::error::AppError;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// Storage format for timestamps (`YYYY-MM-DD HH:MM:SS`).
pub const DB_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time truncated to whole seconds.
pub fn now_local() -> NaiveDateTime {
    truncate_seconds(Local::now().naive_local())
}

/// Drop sub-second precision; stored timestamps only keep seconds.
pub fn truncate_seconds(date: NaiveDateTime) -> NaiveDateTime {
    date.with_nanosecond(0).unwrap_or(date)
}

/// Format a timestamp the way it is stored in the database.
pub fn format_db_datetime(date: &NaiveDateTime) -> String {
    date.format(DB_DATETIME_FORMAT).to_string()
}

/// Parse a stored `YYYY-MM-DD HH:MM:SS` timestamp.
///
/// Older rows may carry a `T` separator or fractional seconds.
pub fn parse_db_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, DB_DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .map(truncate_seconds)
}

/// Parse a user-supplied date: `MM/DD/YY`, `YYYY-MM-DD` or
/// `YYYY-MM-DDTHH:MM:SS`. Plain dates resolve to midnight.
pub fn parse_date_input(raw: &str) -> Result<NaiveDateTime, AppError> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%m/%d/%y") {
        return Ok(date.and_time(NaiveTime::MIN));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN));
    }
    if let Ok(date) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(date);
    }

    Err(AppError::BadRequest(format!(
        "Date must be in MM/DD/YY or YYYY-MM-DD format, got '{}'",
        raw
    )))
}

/// Parse a `YYYY-MM-DD` query-string date.
pub fn parse_query_date(name: &str, raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::BadRequest(format!("Invalid '{}' parameter: expected YYYY-MM-DD", name))
    })
}
