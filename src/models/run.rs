// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Run and split models.
//!
//! A [`Run`] can only be built through [`Run::new`], which validates the
//! distance and derives the pace. Pace is never taken from outside input.

use crate::error::AppError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Elapsed time with whole-second precision, written as `HH:MM:SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ElapsedTime {
    seconds: u32,
}

impl ElapsedTime {
    pub const fn from_secs(seconds: u32) -> Self {
        Self { seconds }
    }

    /// Saturates at the largest representable time.
    pub fn from_hms(hours: u32, minutes: u32, seconds: u32) -> Self {
        Self::checked_from_hms(hours, minutes, seconds).unwrap_or(Self::from_secs(u32::MAX))
    }

    /// `None` when the total does not fit in whole seconds.
    pub fn checked_from_hms(hours: u32, minutes: u32, seconds: u32) -> Option<Self> {
        hours
            .checked_mul(3600)?
            .checked_add(minutes.checked_mul(60)?)?
            .checked_add(seconds)
            .map(Self::from_secs)
    }

    /// Whole seconds from a fractional value (truncated, clamped to the
    /// representable range; NaN is 0).
    pub fn from_secs_f64(seconds: f64) -> Self {
        if seconds > 0.0 {
            Self::from_secs(seconds.min(u32::MAX as f64) as u32)
        } else {
            Self::default()
        }
    }

    pub const fn as_secs(&self) -> u32 {
        self.seconds
    }

    pub fn hours(&self) -> u32 {
        self.seconds / 3600
    }

    pub fn minutes(&self) -> u32 {
        (self.seconds % 3600) / 60
    }

    pub fn secs(&self) -> u32 {
        self.seconds % 60
    }

    /// `MM:SS` form used for paces; hours fold into the minutes.
    pub fn to_minutes_string(&self) -> String {
        format!("{:02}:{:02}", self.seconds / 60, self.secs())
    }
}

impl fmt::Display for ElapsedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours(),
            self.minutes(),
            self.secs()
        )
    }
}

impl FromStr for ElapsedTime {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            AppError::BadRequest(format!("Duration must be in HH:MM:SS format, got '{}'", s))
        };

        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 3 {
            return Err(invalid());
        }

        let mut values = [0u32; 3];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part.trim().parse().map_err(|_| invalid())?;
        }

        let [hours, minutes, seconds] = values;
        if minutes >= 60 || seconds >= 60 {
            return Err(invalid());
        }

        Self::checked_from_hms(hours, minutes, seconds).ok_or_else(|| {
            AppError::BadRequest(format!("Duration '{}' is too long", s))
        })
    }
}

impl Serialize for ElapsedTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ElapsedTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Pace per mile: total seconds divided by distance, truncated to whole seconds.
pub fn pace_per_mile(duration: ElapsedTime, distance_miles: f64) -> ElapsedTime {
    let seconds_per_mile = duration.as_secs() as f64 / distance_miles;
    ElapsedTime::from_secs_f64(seconds_per_mile.floor())
}

/// Per-mile breakdown of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Split {
    mile_number: u32,
    pub duration: ElapsedTime,
    pub pace: ElapsedTime,
    pub heart_rate_avg: Option<i32>,
    pub cadence_avg: Option<i32>,
}

impl Split {
    pub fn new(mile_number: i64, duration: ElapsedTime, pace: ElapsedTime) -> Result<Self, AppError> {
        if mile_number <= 0 {
            return Err(AppError::validation(
                "mile_number",
                format!("must be greater than 0, got {}", mile_number),
            ));
        }
        if mile_number > i64::from(i32::MAX) {
            return Err(AppError::validation(
                "mile_number",
                format!("must be at most {}, got {}", i32::MAX, mile_number),
            ));
        }
        let mile_number = u32::try_from(mile_number)
            .map_err(|_| AppError::validation("mile_number", "out of range"))?;

        Ok(Self {
            mile_number,
            duration,
            pace,
            heart_rate_avg: None,
            cadence_avg: None,
        })
    }

    pub fn mile_number(&self) -> u32 {
        self.mile_number
    }
}

/// A logged run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Run {
    pub activity_id: Option<i64>,
    pub date: NaiveDateTime,
    duration: ElapsedTime,
    distance_miles: f64,
    pace_per_mile: ElapsedTime,
    pub heart_rate_avg: Option<i32>,
    pub heart_rate_max: Option<i32>,
    pub heart_rate_min: Option<i32>,
    pub cadence_avg: Option<i32>,
    pub cadence_max: Option<i32>,
    pub cadence_min: Option<i32>,
    pub temperature: Option<f64>,
    pub weather_type: Option<String>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    splits: Vec<Split>,
}

impl Run {
    /// Build a run, validating the distance and deriving the pace.
    pub fn new(
        date: NaiveDateTime,
        duration: ElapsedTime,
        distance_miles: f64,
    ) -> Result<Self, AppError> {
        if !distance_miles.is_finite() || distance_miles <= 0.0 {
            return Err(AppError::validation(
                "distance_miles",
                format!("must be positive, got {}", distance_miles),
            ));
        }

        Ok(Self {
            activity_id: None,
            date: crate::time_utils::truncate_seconds(date),
            duration,
            distance_miles,
            pace_per_mile: pace_per_mile(duration, distance_miles),
            heart_rate_avg: None,
            heart_rate_max: None,
            heart_rate_min: None,
            cadence_avg: None,
            cadence_max: None,
            cadence_min: None,
            temperature: None,
            weather_type: None,
            humidity: None,
            wind_speed: None,
            splits: Vec::new(),
        })
    }

    pub fn duration(&self) -> ElapsedTime {
        self.duration
    }

    pub fn distance_miles(&self) -> f64 {
        self.distance_miles
    }

    pub fn pace_per_mile(&self) -> ElapsedTime {
        self.pace_per_mile
    }

    pub fn splits(&self) -> &[Split] {
        &self.splits
    }

    /// Attach splits, sorted by mile number. Mile numbers must be unique.
    pub fn set_splits(&mut self, mut splits: Vec<Split>) -> Result<(), AppError> {
        splits.sort_by_key(|s| s.mile_number);
        if let Some(pair) = splits
            .windows(2)
            .find(|pair| pair[0].mile_number == pair[1].mile_number)
        {
            return Err(AppError::validation(
                "splits",
                format!("duplicate mile_number {}", pair[0].mile_number),
            ));
        }
        self.splits = splits;
        Ok(())
    }

    pub fn with_splits(mut self, splits: Vec<Split>) -> Result<Self, AppError> {
        self.set_splits(splits)?;
        Ok(self)
    }
}

/// Wire form of a split.
#[derive(Debug, Clone, Deserialize)]
pub struct SplitRecord {
    pub mile_number: i64,
    pub duration: ElapsedTime,
    pub pace: ElapsedTime,
    pub heart_rate_avg: Option<i32>,
    pub cadence_avg: Option<i32>,
}

/// Wire form of a run, as returned by the REST API.
///
/// `pace_per_mile` is accepted but ignored; [`RunRecord::into_run`]
/// recomputes it.
#[derive(Debug, Clone, Deserialize)]
pub struct RunRecord {
    pub activity_id: Option<i64>,
    pub date: NaiveDateTime,
    pub duration: ElapsedTime,
    pub distance_miles: f64,
    #[serde(default)]
    pub pace_per_mile: Option<ElapsedTime>,
    pub heart_rate_avg: Option<i32>,
    pub heart_rate_max: Option<i32>,
    pub heart_rate_min: Option<i32>,
    pub cadence_avg: Option<i32>,
    pub cadence_max: Option<i32>,
    pub cadence_min: Option<i32>,
    pub temperature: Option<f64>,
    pub weather_type: Option<String>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    #[serde(default)]
    pub splits: Vec<SplitRecord>,
}

impl RunRecord {
    pub fn into_run(self) -> Result<Run, AppError> {
        let mut run = Run::new(self.date, self.duration, self.distance_miles)?;

        if let Some(stored) = self.pace_per_mile {
            if stored != run.pace_per_mile {
                tracing::debug!(
                    activity_id = ?self.activity_id,
                    stored = %stored,
                    computed = %run.pace_per_mile,
                    "Ignoring stale pace"
                );
            }
        }

        run.activity_id = self.activity_id;
        run.heart_rate_avg = self.heart_rate_avg;
        run.heart_rate_max = self.heart_rate_max;
        run.heart_rate_min = self.heart_rate_min;
        run.cadence_avg = self.cadence_avg;
        run.cadence_max = self.cadence_max;
        run.cadence_min = self.cadence_min;
        run.temperature = self.temperature;
        run.weather_type = self.weather_type;
        run.humidity = self.humidity;
        run.wind_speed = self.wind_speed;

        let splits = self
            .splits
            .into_iter()
            .map(|s| {
                let mut split = Split::new(s.mile_number, s.duration, s.pace)?;
                split.heart_rate_avg = s.heart_rate_avg;
                split.cadence_avg = s.cadence_avg;
                Ok(split)
            })
            .collect::<Result<Vec<_>, AppError>>()?;
        run.set_splits(splits)?;

        Ok(run)
    }
}
