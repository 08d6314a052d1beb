// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Plain-text tables for CLI output.

use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{NaiveDate, NaiveDateTime};

use crate::models::run::pace_per_mile;
use crate::models::{ActivityStats, ElapsedTime, Pushup, Run, RunReport};

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn day_label(date: &NaiveDateTime) -> String {
    date.format("%A %m/%d/%y").to_string()
}

/// One row of the recent-activity table.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub distance_miles: f64,
    pub duration: Option<ElapsedTime>,
    pub pushups: u32,
}

impl DailyActivity {
    fn pace(&self) -> Option<ElapsedTime> {
        self.duration
            .filter(|_| self.distance_miles > 0.0)
            .map(|d| pace_per_mile(d, self.distance_miles))
    }
}

fn day_entry(
    days: &mut BTreeMap<NaiveDate, DailyActivity>,
    date: NaiveDate,
) -> &mut DailyActivity {
    days.entry(date).or_insert(DailyActivity {
        date,
        distance_miles: 0.0,
        duration: None,
        pushups: 0,
    })
}

/// Per-day totals, newest day first.
pub fn daily_activity(runs: &[Run], pushups: &[Pushup]) -> Vec<DailyActivity> {
    let mut days: BTreeMap<NaiveDate, DailyActivity> = BTreeMap::new();

    for run in runs {
        let day = day_entry(&mut days, run.date.date());
        day.distance_miles += run.distance_miles();
        let total = day.duration.map(|d| d.as_secs()).unwrap_or(0) + run.duration().as_secs();
        day.duration = Some(ElapsedTime::from_secs(total));
    }
    for pushup in pushups {
        day_entry(&mut days, pushup.date.date()).pushups += pushup.count();
    }

    days.into_values().rev().collect()
}

pub fn recent_activities(runs: &[Run], pushups: &[Pushup], days: u32) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Recent Activities (Last {} Days)", days);
    let _ = writeln!(
        out,
        "{:<22} {:>13} {:>10} {:>10} {:>8}",
        "Date", "Distance (mi)", "Duration", "Pace (/mi)", "Pushups"
    );
    let _ = writeln!(out, "{}", "-".repeat(67));

    let rows = daily_activity(runs, pushups);
    if rows.is_empty() {
        let _ = writeln!(out, "No activities recorded.");
    }
    for row in rows {
        let distance = if row.distance_miles > 0.0 {
            format!("{:.1}", row.distance_miles)
        } else {
            "-".to_string()
        };
        let pushups = if row.pushups > 0 {
            row.pushups.to_string()
        } else {
            "-".to_string()
        };
        let _ = writeln!(
            out,
            "{:<22} {:>13} {:>10} {:>10} {:>8}",
            row.date.format("%A %m/%d/%y").to_string(),
            distance,
            or_dash(row.duration),
            or_dash(row.pace().map(|p| p.to_minutes_string())),
            pushups
        );
    }
    out
}

pub fn stats(stats: &ActivityStats) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Activity Statistics (Last {} Days)",
        stats.period.days
    );
    let _ = writeln!(
        out,
        "{:<10} {:>14} {:>16} {:>20}",
        "Activity", "Total Sessions", "Total Amount", "Average"
    );
    let _ = writeln!(out, "{}", "-".repeat(63));
    let _ = writeln!(
        out,
        "{:<10} {:>14} {:>16} {:>20}",
        "Running",
        stats.runs.total,
        format!("{:.1} miles", stats.runs.total_distance),
        format!("{:.1} miles/run", stats.runs.avg_distance)
    );
    let _ = writeln!(
        out,
        "{:<10} {:>14} {:>16} {:>20}",
        "Pushups",
        stats.pushups.total,
        stats.pushups.total_count,
        format!("{:.0} pushups/day", stats.pushups.avg_count)
    );
    out
}

fn weather(run: &Run) -> String {
    let mut parts = Vec::new();
    if let Some(temperature) = run.temperature {
        parts.push(format!("{:.1}°", temperature));
    }
    if let Some(kind) = run.weather_type.as_deref().filter(|w| !w.is_empty()) {
        parts.push(kind.to_string());
    }
    if let Some(wind) = run.wind_speed.filter(|w| *w > 0.0) {
        parts.push(format!("{}mph wind", wind));
    }
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(", ")
    }
}

pub fn runs(runs: &[Run], start: NaiveDate, end: NaiveDate, show_splits: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Runs from {} to {}",
        start.format("%m/%d/%y"),
        end.format("%m/%d/%y")
    );
    let _ = writeln!(
        out,
        "{:<31} {:>13} {:>10} {:>10} {:>5} {:>8}  {}",
        "Date", "Distance (mi)", "Duration", "Pace (/mi)", "HR", "Cadence", "Weather"
    );
    let _ = writeln!(out, "{}", "-".repeat(90));

    for run in runs {
        let _ = writeln!(
            out,
            "{:<31} {:>13} {:>10} {:>10} {:>5} {:>8}  {}",
            run.date.format("%A %m/%d/%y %I:%M %p").to_string(),
            format!("{:.1}", run.distance_miles()),
            run.duration(),
            run.pace_per_mile().to_minutes_string(),
            or_dash(run.heart_rate_avg),
            or_dash(run.cadence_avg),
            weather(run)
        );

        if show_splits && !run.splits().is_empty() {
            let _ = writeln!(
                out,
                "    {:>4} {:>10} {:>10} {:>5} {:>8}",
                "Mile", "Duration", "Pace", "HR", "Cadence"
            );
            for split in run.splits() {
                let _ = writeln!(
                    out,
                    "    {:>4} {:>10} {:>10} {:>5} {:>8}",
                    split.mile_number(),
                    split.duration,
                    split.pace.to_minutes_string(),
                    or_dash(split.heart_rate_avg),
                    or_dash(split.cadence_avg)
                );
            }
        }
    }
    out
}

pub fn report(report: &RunReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Overall Statistics (Last {} Days)", report.days);
    let _ = writeln!(out, "{}", "-".repeat(40));
    let _ = writeln!(out, "Total Runs:       {}", report.total_runs);
    let _ = writeln!(out, "Total Miles:      {:.1}", report.total_miles);
    if let Some(pace) = report.average_pace {
        let _ = writeln!(out, "Average Pace:     {}", pace);
    }
    if let Some(hr) = report.average_heart_rate {
        let _ = writeln!(out, "Average HR:       {:.0} bpm", hr);
    }
    if let Some(cadence) = report.average_cadence {
        let _ = writeln!(out, "Average Cadence:  {:.0} spm", cadence);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Personal Records");
    let _ = writeln!(out, "{}", "-".repeat(40));
    if let Some(run) = &report.fastest_run {
        let _ = writeln!(
            out,
            "Fastest Run:      {:.1}mi at {}/mi on {}",
            run.distance_miles,
            run.pace_per_mile.to_minutes_string(),
            run.date.format("%m/%d/%y")
        );
    }
    if let Some(run) = &report.longest_run {
        let _ = writeln!(
            out,
            "Longest Run:      {:.1}mi on {}",
            run.distance_miles,
            run.date.format("%m/%d/%y")
        );
    }
    if let Some(run) = &report.highest_cadence_run {
        if let Some(cadence) = run.cadence_avg {
            let _ = writeln!(
                out,
                "Highest Cadence:  {} spm on {}",
                cadence,
                run.date.format("%m/%d/%y")
            );
        }
    }
    out
}

pub fn config(lines: &[(&'static str, String)]) -> String {
    let width = lines.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    let mut out = String::from("Current Configuration\n");
    for (key, value) in lines {
        let _ = writeln!(out, "  {:<width$}  {}", format!("{}:", key), value, width = width + 1);
    }
    out
}

/// Confirmation line for a logged run.
pub fn run_logged(run: &Run) -> String {
    format!(
        "Logged run: {} miles in {} on {}",
        run.distance_miles(),
        run.duration(),
        day_label(&run.date)
    )
}

pub fn pushups_logged(pushup: &Pushup) -> String {
    format!(
        "Logged {} pushups on {}",
        pushup.count(),
        day_label(&pushup.date)
    )
}
