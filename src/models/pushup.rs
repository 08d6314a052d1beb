// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pushup log entry.

use crate::error::AppError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A pushup entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pushup {
    pub date: NaiveDateTime,
    count: u32,
}

impl Pushup {
    pub fn new(date: NaiveDateTime, count: i64) -> Result<Self, AppError> {
        if count <= 0 {
            return Err(AppError::validation(
                "count",
                format!("must be positive, got {}", count),
            ));
        }
        if count > i64::from(i32::MAX) {
            return Err(AppError::validation(
                "count",
                format!("must be at most {}, got {}", i32::MAX, count),
            ));
        }
        let count =
            u32::try_from(count).map_err(|_| AppError::validation("count", "out of range"))?;

        Ok(Self {
            date: crate::time_utils::truncate_seconds(date),
            count,
        })
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

/// Wire form of a pushup entry.
#[derive(Debug, Clone, Deserialize)]
pub struct PushupRecord {
    pub date: NaiveDateTime,
    pub count: i64,
}

impl PushupRecord {
    pub fn into_pushup(self) -> Result<Pushup, AppError> {
        Pushup::new(self.date, self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_create_valid_pushup() {
        let pushup = Pushup::new(date(), 75).unwrap();
        assert_eq!(pushup.count(), 75);
        assert_eq!(pushup.date, date());
    }

    #[test]
    fn test_pushup_rejects_non_positive_count() {
        assert!(matches!(
            Pushup::new(date(), 0),
            Err(AppError::Validation { field: "count", .. })
        ));
        assert!(Pushup::new(date(), -10).is_err());
    }

    #[test]
    fn test_pushup_count_fits_integer_column() {
        assert!(Pushup::new(date(), i64::from(i32::MAX)).is_ok());
        assert!(matches!(
            Pushup::new(date(), 3_000_000_000),
            Err(AppError::Validation { field: "count", .. })
        ));
    }
}
