// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Synchronous DuckDB access.
//!
//! [`Database`] owns a single DuckDB connection and provides typed operations
//! for runs, splits and pushups. Every call blocks; async callers go through
//! [`crate::db::Store`], which runs them on the blocking pool.
//!
//! Connecting retries while another process holds the file lock and can fall
//! back to a read-only connection when the caller allows it.

use std::path::Path;
use std::time::Duration;

use chrono::NaiveDateTime;
use duckdb::{params, params_from_iter, Connection};

use crate::db::{schema, DateRange};
use crate::error::AppError;
use crate::models::{
    ActivityStats, ElapsedTime, Pushup, Run, RunRecord, RunReport, Split, StatsPeriod,
};
use crate::time_utils::{format_db_datetime, parse_db_datetime};

const RUN_COLUMNS: &str = "activity_id, date, duration, distance_miles, pace_per_mile, \
     heart_rate_avg, heart_rate_max, heart_rate_min, cadence_avg, cadence_max, cadence_min, \
     temperature, weather_type, humidity, wind_speed";

/// How to connect to the database file.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Connection attempts before giving up on a read-write connection.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
    /// Open read-only if the write lock stays unavailable.
    pub read_only_fallback: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
            read_only_fallback: false,
        }
    }
}

impl ConnectOptions {
    pub fn with_read_only_fallback(mut self, allowed: bool) -> Self {
        self.read_only_fallback = allowed;
        self
    }
}

/// Requested connection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadWrite,
    ReadOnly,
}

/// Why opening a connection failed.
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    /// Another process holds the file lock.
    #[error("database is locked: {0}")]
    Locked(String),
    #[error("{0}")]
    Other(String),
}

impl OpenError {
    fn classify(err: duckdb::Error) -> Self {
        let message = err.to_string();
        if message.contains("Conflicting lock") || message.contains("Could not set lock") {
            Self::Locked(message)
        } else {
            Self::Other(message)
        }
    }
}

/// Open a connection, retrying only on lock conflicts.
///
/// Returns the connection and whether it is read-only.
pub fn connect_with_retry<C, F>(
    options: &ConnectOptions,
    mut open: F,
) -> Result<(C, bool), AppError>
where
    F: FnMut(Access) -> Result<C, OpenError>,
{
    let max_attempts = options.max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        tracing::debug!(attempt, max_attempts, "Connecting to database");

        match open(Access::ReadWrite) {
            Ok(conn) => return Ok((conn, false)),
            Err(OpenError::Locked(detail)) => {
                last_error = detail;
                if attempt < max_attempts {
                    tracing::warn!(
                        attempt,
                        delay_ms = options.retry_delay.as_millis() as u64,
                        "Database is locked by another process, retrying"
                    );
                    std::thread::sleep(options.retry_delay);
                }
            }
            Err(OpenError::Other(detail)) => return Err(AppError::storage("connect", detail)),
        }
    }

    if options.read_only_fallback {
        tracing::warn!(
            attempts = max_attempts,
            "Could not acquire write lock, opening read-only"
        );
        return open(Access::ReadOnly)
            .map(|conn| (conn, true))
            .map_err(|e| {
                AppError::storage("connect", format!("read-only fallback failed: {}", e))
            });
    }

    Err(AppError::storage(
        "connect",
        format!(
            "database still locked after {} attempts: {}",
            max_attempts, last_error
        ),
    ))
}

fn open_connection(path: &Path, access: Access) -> Result<Connection, OpenError> {
    let result = match access {
        Access::ReadWrite => Connection::open(path),
        Access::ReadOnly => duckdb::Config::default()
            .access_mode(duckdb::AccessMode::ReadOnly)
            .and_then(|config| Connection::open_with_flags(path, config)),
    };
    result.map_err(OpenError::classify)
}

fn storage_err(operation: &'static str) -> impl Fn(duckdb::Error) -> AppError {
    move |e| AppError::storage(operation, e)
}

/// Positive 63-bit id for a new run.
pub fn generate_activity_id() -> i64 {
    ((rand::random::<u64>() >> 1) as i64).max(1)
}

/// Raw `runs` row before validation.
struct RunRow {
    activity_id: i64,
    date: String,
    duration: String,
    distance_miles: f64,
    pace_per_mile: Option<String>,
    heart_rate_avg: Option<i32>,
    heart_rate_max: Option<i32>,
    heart_rate_min: Option<i32>,
    cadence_avg: Option<i32>,
    cadence_max: Option<i32>,
    cadence_min: Option<i32>,
    temperature: Option<f64>,
    weather_type: Option<String>,
    humidity: Option<f64>,
    wind_speed: Option<f64>,
}

impl RunRow {
    fn from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            activity_id: row.get(0)?,
            date: row.get(1)?,
            duration: row.get(2)?,
            distance_miles: row.get(3)?,
            pace_per_mile: row.get(4)?,
            heart_rate_avg: row.get(5)?,
            heart_rate_max: row.get(6)?,
            heart_rate_min: row.get(7)?,
            cadence_avg: row.get(8)?,
            cadence_max: row.get(9)?,
            cadence_min: row.get(10)?,
            temperature: row.get(11)?,
            weather_type: row.get(12)?,
            humidity: row.get(13)?,
            wind_speed: row.get(14)?,
        })
    }

    /// Rebuild the run through the validating constructor.
    fn into_run(self) -> Result<Run, AppError> {
        let corrupt = |detail: String| {
            AppError::storage(
                "get_runs",
                format!("corrupt run {}: {}", self.activity_id, detail),
            )
        };

        let date = parse_db_datetime(&self.date)
            .ok_or_else(|| corrupt(format!("bad date '{}'", self.date)))?;
        let duration: ElapsedTime = self
            .duration
            .parse()
            .map_err(|e: AppError| corrupt(e.to_string()))?;

        let record = RunRecord {
            activity_id: Some(self.activity_id),
            date,
            duration,
            distance_miles: self.distance_miles,
            pace_per_mile: self.pace_per_mile.as_deref().and_then(|p| p.parse().ok()),
            heart_rate_avg: self.heart_rate_avg,
            heart_rate_max: self.heart_rate_max,
            heart_rate_min: self.heart_rate_min,
            cadence_avg: self.cadence_avg,
            cadence_max: self.cadence_max,
            cadence_min: self.cadence_min,
            temperature: self.temperature,
            weather_type: self.weather_type.clone(),
            humidity: self.humidity,
            wind_speed: self.wind_speed,
            splits: Vec::new(),
        };
        record.into_run().map_err(|e| corrupt(e.to_string()))
    }
}

#[derive(Clone, Copy)]
enum WriteMode {
    Insert,
    Replace,
}

impl WriteMode {
    fn verb(self) -> &'static str {
        match self {
            WriteMode::Insert => "INSERT INTO",
            WriteMode::Replace => "INSERT OR REPLACE INTO",
        }
    }
}

fn write_run(conn: &Connection, run: &Run, id: i64, mode: WriteMode) -> duckdb::Result<()> {
    let sql = format!(
        "{} runs ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        mode.verb(),
        RUN_COLUMNS
    );
    conn.execute(
        &sql,
        params![
            id,
            format_db_datetime(&run.date),
            run.duration().to_string(),
            run.distance_miles(),
            run.pace_per_mile().to_string(),
            run.heart_rate_avg,
            run.heart_rate_max,
            run.heart_rate_min,
            run.cadence_avg,
            run.cadence_max,
            run.cadence_min,
            run.temperature,
            run.weather_type,
            run.humidity,
            run.wind_speed,
        ],
    )?;

    let split_sql = format!(
        "{} splits (activity_id, mile_number, duration, pace, heart_rate_avg, cadence_avg) \
         VALUES (?, ?, ?, ?, ?, ?)",
        mode.verb()
    );
    for split in run.splits() {
        conn.execute(
            &split_sql,
            params![
                id,
                i64::from(split.mile_number()),
                split.duration.to_string(),
                split.pace.to_string(),
                split.heart_rate_avg,
                split.cadence_avg,
            ],
        )?;
    }
    Ok(())
}

/// A DuckDB connection with typed operations.
pub struct Database {
    conn: Connection,
    read_only: bool,
}

impl Database {
    /// Open (creating if needed) the database file at `path`.
    pub fn open(path: &Path, options: &ConnectOptions) -> Result<Self, AppError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| AppError::storage("connect", e))?;
        }

        let (conn, read_only) = connect_with_retry(options, |access| open_connection(path, access))?;
        let db = Self { conn, read_only };
        db.init_schema()?;

        tracing::info!(path = %path.display(), read_only, "Connected to database");
        Ok(db)
    }

    /// In-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self, AppError> {
        let conn = Connection::open_in_memory().map_err(storage_err("connect"))?;
        let db = Self {
            conn,
            read_only: false,
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<(), AppError> {
        if self.read_only {
            return Ok(());
        }
        schema::create_tables(&self.conn).map_err(storage_err("create_tables"))
    }

    fn ensure_writable(&self, operation: &'static str) -> Result<(), AppError> {
        if self.read_only {
            return Err(AppError::storage(
                operation,
                "database was opened read-only because another process holds the write lock",
            ));
        }
        Ok(())
    }

    /// Runs newest first, each with its splits.
    pub fn get_runs(&self, range: &DateRange, limit: Option<u32>) -> Result<Vec<Run>, AppError> {
        let (filter, params) = range.where_clause();
        let mut sql = format!(
            "SELECT {} FROM runs{} ORDER BY date DESC",
            RUN_COLUMNS, filter
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        tracing::debug!(sql = %sql, params = ?params, "Querying runs");

        let rows = {
            let mut stmt = self.conn.prepare(&sql).map_err(storage_err("get_runs"))?;
            let rows = stmt
                .query_map(params_from_iter(params.iter()), RunRow::from_row)
                .map_err(storage_err("get_runs"))?;
            rows.collect::<Result<Vec<_>, _>>()
                .map_err(storage_err("get_runs"))?
        };

        rows.into_iter().map(|row| self.load_run(row)).collect()
    }

    /// A single run by id.
    pub fn get_run(&self, activity_id: i64) -> Result<Option<Run>, AppError> {
        let sql = format!("SELECT {} FROM runs WHERE activity_id = ?", RUN_COLUMNS);
        let row = {
            let mut stmt = self.conn.prepare(&sql).map_err(storage_err("get_run"))?;
            let mut rows = stmt
                .query_map(params![activity_id], RunRow::from_row)
                .map_err(storage_err("get_run"))?;
            rows.next().transpose().map_err(storage_err("get_run"))?
        };

        row.map(|row| self.load_run(row)).transpose()
    }

    fn load_run(&self, row: RunRow) -> Result<Run, AppError> {
        let activity_id = row.activity_id;
        let mut run = row.into_run()?;
        run.set_splits(self.splits_for_run(activity_id))?;
        Ok(run)
    }

    /// Splits for one run. Failures are logged and yield no splits.
    fn splits_for_run(&self, activity_id: i64) -> Vec<Split> {
        match self.query_splits(activity_id) {
            Ok(splits) => splits,
            Err(e) => {
                tracing::warn!(activity_id, error = %e, "Failed to load splits");
                Vec::new()
            }
        }
    }

    fn query_splits(&self, activity_id: i64) -> Result<Vec<Split>, AppError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT mile_number, duration, pace, heart_rate_avg, cadence_avg \
                 FROM splits WHERE activity_id = ? ORDER BY mile_number ASC",
            )
            .map_err(storage_err("get_splits"))?;

        let rows = stmt
            .query_map(params![activity_id], |row| {
                Ok((
                    row.get::<_, i32>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<i32>>(3)?,
                    row.get::<_, Option<i32>>(4)?,
                ))
            })
            .map_err(storage_err("get_splits"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage_err("get_splits"))?;

        let mut splits = Vec::with_capacity(rows.len());
        for (mile_number, duration, pace, heart_rate_avg, cadence_avg) in rows {
            let mut split = Split::new(i64::from(mile_number), duration.parse()?, pace.parse()?)?;
            split.heart_rate_avg = heart_rate_avg;
            split.cadence_avg = cadence_avg;
            splits.push(split);
        }
        Ok(splits)
    }

    /// Insert a run and its splits in one transaction.
    ///
    /// Assigns a random id when the run has none. A duplicate id fails and
    /// leaves nothing behind.
    pub fn create_run(&mut self, mut run: Run) -> Result<Run, AppError> {
        self.ensure_writable("create_run")?;
        let id = *run.activity_id.get_or_insert_with(generate_activity_id);

        let tx = self
            .conn
            .transaction()
            .map_err(storage_err("create_run"))?;
        write_run(&tx, &run, id, WriteMode::Insert).map_err(storage_err("create_run"))?;
        tx.commit().map_err(storage_err("create_run"))?;

        tracing::info!(
            activity_id = id,
            splits = run.splits().len(),
            "Created run"
        );
        Ok(run)
    }

    /// Insert or replace a run and its splits, dropping splits past the new
    /// last mile.
    pub fn upsert_run(&mut self, run: Run) -> Result<Run, AppError> {
        let mut runs = self.upsert_runs(vec![run])?;
        runs.pop()
            .ok_or_else(|| AppError::storage("upsert_run", "no run written"))
    }

    /// Upsert a batch of runs in one transaction. Either every run is
    /// written or none is.
    pub fn upsert_runs(&mut self, mut runs: Vec<Run>) -> Result<Vec<Run>, AppError> {
        self.ensure_writable("upsert_runs")?;

        let tx = self
            .conn
            .transaction()
            .map_err(storage_err("upsert_runs"))?;
        for run in &mut runs {
            let id = *run.activity_id.get_or_insert_with(generate_activity_id);
            let last_mile = run.splits().last().map(Split::mile_number).unwrap_or(0);

            write_run(&tx, run, id, WriteMode::Replace).map_err(storage_err("upsert_runs"))?;
            tx.execute(
                "DELETE FROM splits WHERE activity_id = ? AND mile_number > ?",
                params![id, i64::from(last_mile)],
            )
            .map_err(storage_err("upsert_runs"))?;
        }
        tx.commit().map_err(storage_err("upsert_runs"))?;

        tracing::debug!(count = runs.len(), "Upserted runs");
        Ok(runs)
    }

    /// Pushups newest first.
    pub fn get_pushups(
        &self,
        range: &DateRange,
        limit: Option<u32>,
    ) -> Result<Vec<Pushup>, AppError> {
        let (filter, params) = range.where_clause();
        let mut sql = format!(
            "SELECT date, count FROM pushups{} ORDER BY date DESC",
            filter
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        tracing::debug!(sql = %sql, params = ?params, "Querying pushups");

        let mut stmt = self.conn.prepare(&sql).map_err(storage_err("get_pushups"))?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i32>(1)?))
            })
            .map_err(storage_err("get_pushups"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage_err("get_pushups"))?;

        rows.into_iter()
            .map(|(date, count)| {
                let parsed = parse_db_datetime(&date).ok_or_else(|| {
                    AppError::storage("get_pushups", format!("corrupt pushup date '{}'", date))
                })?;
                Pushup::new(parsed, i64::from(count))
                    .map_err(|e| AppError::storage("get_pushups", format!("corrupt pushup: {}", e)))
            })
            .collect()
    }

    pub fn create_pushup(&self, pushup: Pushup) -> Result<Pushup, AppError> {
        self.ensure_writable("create_pushup")?;
        self.conn
            .execute(
                "INSERT INTO pushups (date, count) VALUES (?, ?)",
                params![format_db_datetime(&pushup.date), i64::from(pushup.count())],
            )
            .map_err(storage_err("create_pushup"))?;

        tracing::info!(count = pushup.count(), "Created pushup entry");
        Ok(pushup)
    }

    /// Totals over `[now - days, now]`.
    pub fn get_stats(&self, days: u32, now: NaiveDateTime) -> Result<ActivityStats, AppError> {
        let period = StatsPeriod::ending_at(now, days);
        let range = DateRange::last_days(days, now);
        let runs = self.get_runs(&range, None)?;
        let pushups = self.get_pushups(&range, None)?;
        Ok(ActivityStats::compute(&runs, &pushups, period))
    }

    /// Run report over `[now - days, now]`.
    pub fn get_report(&self, days: u32, now: NaiveDateTime) -> Result<RunReport, AppError> {
        let runs = self.get_runs(&DateRange::last_days(days, now), None)?;
        Ok(RunReport::compute(&runs, days))
    }

    /// Drop all tables and recreate them empty.
    pub fn reset(&mut self) -> Result<(), AppError> {
        self.ensure_writable("reset")?;
        schema::recreate_tables(&mut self.conn).map_err(storage_err("reset"))?;
        tracing::warn!("Dropped and recreated all tables");
        Ok(())
    }

    /// Flush the write-ahead log into the database file.
    pub fn checkpoint(&self) -> Result<(), AppError> {
        if self.read_only {
            return Ok(());
        }
        self.conn
            .execute_batch("CHECKPOINT")
            .map_err(storage_err("checkpoint"))
    }

    pub fn close(self) {
        if let Err((_, e)) = self.conn.close() {
            tracing::warn!(error = %e, "Error closing database connection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::cell::Cell;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn run(day: u32) -> Run {
        Run::new(at(day, 7), ElapsedTime::from_hms(0, 30, 15), 3.2).unwrap()
    }

    fn no_delay(max_attempts: u32, read_only_fallback: bool) -> ConnectOptions {
        ConnectOptions {
            max_attempts,
            retry_delay: Duration::ZERO,
            read_only_fallback,
        }
    }

    #[test]
    fn test_retry_succeeds_after_lock_clears() {
        let calls = Cell::new(0);
        let result = connect_with_retry(&no_delay(3, false), |access| {
            calls.set(calls.get() + 1);
            assert_eq!(access, Access::ReadWrite);
            if calls.get() < 3 {
                Err(OpenError::Locked("Conflicting lock".into()))
            } else {
                Ok("conn")
            }
        });

        assert_eq!(result.unwrap(), ("conn", false));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_retry_falls_back_to_read_only() {
        let result = connect_with_retry(&no_delay(2, true), |access| match access {
            Access::ReadWrite => Err(OpenError::Locked("Could not set lock".into())),
            Access::ReadOnly => Ok("ro"),
        });

        assert_eq!(result.unwrap(), ("ro", true));
    }

    #[test]
    fn test_retry_exhausted_without_fallback() {
        let calls = Cell::new(0);
        let result: Result<((), bool), _> = connect_with_retry(&no_delay(3, false), |_| {
            calls.set(calls.get() + 1);
            Err(OpenError::Locked("Conflicting lock".into()))
        });

        assert!(matches!(
            result,
            Err(AppError::StorageUnavailable { operation: "connect", .. })
        ));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_other_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<((), bool), _> = connect_with_retry(&no_delay(3, true), |_| {
            calls.set(calls.get() + 1);
            Err(OpenError::Other("permission denied".into()))
        });

        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_generated_ids_are_positive() {
        for _ in 0..1000 {
            assert!(generate_activity_id() > 0);
        }
    }

    #[test]
    fn test_create_and_get_run_with_splits() {
        let mut db = Database::open_in_memory().unwrap();
        let splits = vec![
            Split::new(2, ElapsedTime::from_hms(0, 9, 40), ElapsedTime::from_hms(0, 9, 40))
                .unwrap(),
            Split::new(1, ElapsedTime::from_hms(0, 9, 20), ElapsedTime::from_hms(0, 9, 20))
                .unwrap(),
        ];
        let created = db.create_run(run(1).with_splits(splits).unwrap()).unwrap();
        let id = created.activity_id.unwrap();
        assert!(id > 0);

        let fetched = db.get_run(id).unwrap().unwrap();
        assert_eq!(fetched, created);
        let miles: Vec<u32> = fetched.splits().iter().map(Split::mile_number).collect();
        assert_eq!(miles, vec![1, 2]);
        assert_eq!(fetched.pace_per_mile().to_string(), "00:09:27");
    }

    #[test]
    fn test_get_run_missing() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_run(42).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_id_rolls_back_splits() {
        let mut db = Database::open_in_memory().unwrap();
        let mut first = run(1);
        first.activity_id = Some(7);
        db.create_run(first).unwrap();

        let mut second = run(2)
            .with_splits(vec![Split::new(
                5,
                ElapsedTime::from_hms(0, 9, 0),
                ElapsedTime::from_hms(0, 9, 0),
            )
            .unwrap()])
            .unwrap();
        second.activity_id = Some(7);

        assert!(matches!(
            db.create_run(second),
            Err(AppError::StorageUnavailable { operation: "create_run", .. })
        ));

        let stored = db.get_run(7).unwrap().unwrap();
        assert_eq!(stored.date, at(1, 7));
        assert!(stored.splits().is_empty());
    }

    #[test]
    fn test_get_runs_newest_first_with_limit() {
        let mut db = Database::open_in_memory().unwrap();
        for day in [3, 1, 2] {
            db.create_run(run(day)).unwrap();
        }

        let runs = db.get_runs(&DateRange::all(), Some(2)).unwrap();
        let dates: Vec<_> = runs.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![at(3, 7), at(2, 7)]);
    }

    #[test]
    fn test_end_date_includes_whole_day() {
        let mut db = Database::open_in_memory().unwrap();
        let late = Run::new(
            at(1, 23) + chrono::Duration::seconds(59 * 60 + 59),
            ElapsedTime::from_hms(0, 30, 0),
            3.0,
        )
        .unwrap();
        db.create_run(late).unwrap();
        db.create_run(run(2)).unwrap();

        let day = NaiveDate::from_ymd_opt(2025, 6, 1);
        let runs = db
            .get_runs(&DateRange::between(day, day), None)
            .unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].date.format("%H:%M:%S").to_string(), "23:59:59");
    }

    #[test]
    fn test_upsert_replaces_run_and_trims_splits() {
        let mut db = Database::open_in_memory().unwrap();
        let split = |mile| {
            Split::new(mile, ElapsedTime::from_hms(0, 9, 0), ElapsedTime::from_hms(0, 9, 0))
                .unwrap()
        };

        let mut original = run(1).with_splits(vec![split(1), split(2), split(3)]).unwrap();
        original.activity_id = Some(99);
        db.upsert_run(original).unwrap();

        let mut updated = Run::new(at(1, 7), ElapsedTime::from_hms(0, 20, 0), 2.0)
            .unwrap()
            .with_splits(vec![split(1), split(2)])
            .unwrap();
        updated.activity_id = Some(99);
        db.upsert_run(updated).unwrap();

        let stored = db.get_run(99).unwrap().unwrap();
        assert_eq!(stored.distance_miles(), 2.0);
        assert_eq!(stored.splits().len(), 2);
        assert_eq!(db.get_runs(&DateRange::all(), None).unwrap().len(), 1);
    }

    #[test]
    fn test_pushups_and_stats() {
        let mut db = Database::open_in_memory().unwrap();
        db.create_pushup(Pushup::new(at(10, 8), 40).unwrap()).unwrap();
        db.create_pushup(Pushup::new(at(12, 8), 60).unwrap()).unwrap();
        db.create_pushup(Pushup::new(at(1, 8), 500).unwrap()).unwrap();
        db.create_run(run(11)).unwrap();

        let pushups = db.get_pushups(&DateRange::all(), None).unwrap();
        assert_eq!(pushups[0].date, at(12, 8));

        let stats = db.get_stats(7, at(14, 12)).unwrap();
        assert_eq!(stats.pushups.total, 2);
        assert_eq!(stats.pushups.total_count, 100);
        assert_eq!(stats.runs.total, 1);
        assert_eq!(stats.period.days, 7);
    }

    #[test]
    fn test_stats_empty_database() {
        let db = Database::open_in_memory().unwrap();
        let stats = db.get_stats(30, at(30, 12)).unwrap();
        assert_eq!(stats.runs.total, 0);
        assert_eq!(stats.runs.avg_distance, 0.0);
        assert_eq!(stats.pushups.avg_count, 0.0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut db = Database::open_in_memory().unwrap();
        db.create_run(run(1)).unwrap();
        db.create_pushup(Pushup::new(at(1, 8), 10).unwrap()).unwrap();

        db.reset().unwrap();

        assert!(db.get_runs(&DateRange::all(), None).unwrap().is_empty());
        assert!(db.get_pushups(&DateRange::all(), None).unwrap().is_empty());
    }

    #[test]
    fn test_stale_pace_is_recomputed() {
        let mut db = Database::open_in_memory().unwrap();
        let created = db.create_run(run(1)).unwrap();
        let id = created.activity_id.unwrap();
        db.conn
            .execute(
                "UPDATE runs SET pace_per_mile = '00:01:00' WHERE activity_id = ?",
                params![id],
            )
            .unwrap();

        let fetched = db.get_run(id).unwrap().unwrap();
        assert_eq!(fetched.pace_per_mile(), created.pace_per_mile());
    }
}
