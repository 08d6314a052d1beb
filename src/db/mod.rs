// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (DuckDB, optionally replicated to S3).

pub mod database;
pub mod schema;
pub mod store;

pub use database::{ConnectOptions, Database};
pub use store::Store;

use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Longest reporting window, in days, accepted by the API and the CLI.
pub const MAX_DAYS: u32 = 3650;

/// `now - days`, clamped to the earliest representable time.
pub fn days_before(now: NaiveDateTime, days: u32) -> NaiveDateTime {
    now.checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(NaiveDateTime::MIN)
}

/// Inclusive calendar-date filter on the stored `date` column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// No filter.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Calendar dates covering `[now - days, now]`.
    pub fn last_days(days: u32, now: NaiveDateTime) -> Self {
        Self {
            start: Some(days_before(now, days).date()),
            end: Some(now.date()),
        }
    }

    /// `WHERE` clause and positional parameters for this range.
    ///
    /// Only the date part of the stored timestamp is compared, so the end
    /// date includes the whole day.
    pub(crate) fn where_clause(&self) -> (String, Vec<String>) {
        let mut conditions = Vec::new();
        let mut params = Vec::new();

        if let Some(start) = self.start {
            conditions.push("substr(date, 1, 10) >= ?");
            params.push(start.format("%Y-%m-%d").to_string());
        }
        if let Some(end) = self.end {
            conditions.push("substr(date, 1, 10) <= ?");
            params.push(end.format("%Y-%m-%d").to_string());
        }

        if conditions.is_empty() {
            (String::new(), params)
        } else {
            (format!(" WHERE {}", conditions.join(" AND ")), params)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_where_clause_empty() {
        let (clause, params) = DateRange::all().where_clause();
        assert!(clause.is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn test_where_clause_both_bounds() {
        let range = DateRange::between(
            NaiveDate::from_ymd_opt(2025, 1, 1),
            NaiveDate::from_ymd_opt(2025, 1, 31),
        );
        let (clause, params) = range.where_clause();
        assert_eq!(
            clause,
            " WHERE substr(date, 1, 10) >= ? AND substr(date, 1, 10) <= ?"
        );
        assert_eq!(params, vec!["2025-01-01", "2025-01-31"]);
    }

    #[test]
    fn test_last_days() {
        let now = NaiveDate::from_ymd_opt(2025, 6, 30)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap();
        let range = DateRange::last_days(7, now);
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2025, 6, 23));
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2025, 6, 30));
    }

    #[test]
    fn test_last_days_clamps_huge_windows() {
        let now = NaiveDate::from_ymd_opt(2025, 6, 30)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap();
        let range = DateRange::last_days(u32::MAX, now);
        assert_eq!(range.start, Some(NaiveDateTime::MIN.date()));
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2025, 6, 30));
    }
}
