// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity statistics and run reports.
//!
//! Both are computed from runs and pushups already in memory, so they can be
//! exercised without a database.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::{ElapsedTime, Pushup, Run};

/// Reporting window echoed back with the stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsPeriod {
    pub days: u32,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
}

impl StatsPeriod {
    /// The window `[end - days, end]`.
    pub fn ending_at(end_date: NaiveDateTime, days: u32) -> Self {
        Self {
            days,
            start_date: crate::db::days_before(end_date, days),
            end_date,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunTotals {
    pub total: u32,
    pub total_distance: f64,
    pub avg_distance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushupTotals {
    pub total: u32,
    pub total_count: u64,
    pub avg_count: f64,
}

/// Aggregates over a reporting window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityStats {
    pub runs: RunTotals,
    pub pushups: PushupTotals,
    pub period: StatsPeriod,
}

impl ActivityStats {
    /// Compute totals and means. Means are 0 when there is nothing to average.
    pub fn compute(runs: &[Run], pushups: &[Pushup], period: StatsPeriod) -> Self {
        let total_distance: f64 = runs.iter().map(Run::distance_miles).sum();
        let total_count: u64 = pushups.iter().map(|p| u64::from(p.count())).sum();

        Self {
            runs: RunTotals {
                total: runs.len() as u32,
                total_distance,
                avg_distance: mean(total_distance, runs.len()),
            },
            pushups: PushupTotals {
                total: pushups.len() as u32,
                total_count,
                avg_count: mean(total_count as f64, pushups.len()),
            },
            period,
        }
    }
}

fn mean(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// A notable run in a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunHighlight {
    pub activity_id: Option<i64>,
    pub date: NaiveDateTime,
    pub distance_miles: f64,
    pub pace_per_mile: ElapsedTime,
    pub cadence_avg: Option<i32>,
}

impl From<&Run> for RunHighlight {
    fn from(run: &Run) -> Self {
        Self {
            activity_id: run.activity_id,
            date: run.date,
            distance_miles: run.distance_miles(),
            pace_per_mile: run.pace_per_mile(),
            cadence_avg: run.cadence_avg,
        }
    }
}

/// Summary report of the runs in a window, with personal records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub days: u32,
    pub total_runs: u32,
    pub total_miles: f64,
    pub average_pace: Option<ElapsedTime>,
    pub average_heart_rate: Option<f64>,
    pub average_cadence: Option<f64>,
    pub fastest_run: Option<RunHighlight>,
    pub longest_run: Option<RunHighlight>,
    pub highest_cadence_run: Option<RunHighlight>,
}

impl RunReport {
    pub fn compute(runs: &[Run], days: u32) -> Self {
        let total_miles: f64 = runs.iter().map(Run::distance_miles).sum();

        let average_pace = if runs.is_empty() {
            None
        } else {
            let total: u64 = runs
                .iter()
                .map(|r| u64::from(r.pace_per_mile().as_secs()))
                .sum();
            Some(ElapsedTime::from_secs((total / runs.len() as u64) as u32))
        };

        let average_of = |values: Vec<i32>| {
            if values.is_empty() {
                None
            } else {
                Some(values.iter().map(|v| f64::from(*v)).sum::<f64>() / values.len() as f64)
            }
        };

        let fastest_run = runs.iter().min_by_key(|r| r.pace_per_mile());
        let longest_run = runs
            .iter()
            .max_by(|a, b| a.distance_miles().total_cmp(&b.distance_miles()));
        let highest_cadence_run = runs
            .iter()
            .filter(|r| r.cadence_avg.is_some())
            .max_by_key(|r| r.cadence_avg);

        Self {
            days,
            total_runs: runs.len() as u32,
            total_miles,
            average_pace,
            average_heart_rate: average_of(runs.iter().filter_map(|r| r.heart_rate_avg).collect()),
            average_cadence: average_of(runs.iter().filter_map(|r| r.cadence_avg).collect()),
            fastest_run: fastest_run.map(RunHighlight::from),
            longest_run: longest_run.map(RunHighlight::from),
            highest_cadence_run: highest_cadence_run.map(RunHighlight::from),
        }
    }
}
