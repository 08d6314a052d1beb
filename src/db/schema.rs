// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Table definitions.

use duckdb::Connection;

const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS runs (
    activity_id BIGINT PRIMARY KEY,
    date VARCHAR NOT NULL,
    duration VARCHAR NOT NULL,
    distance_miles DOUBLE NOT NULL,
    pace_per_mile VARCHAR,
    heart_rate_avg INTEGER,
    heart_rate_max INTEGER,
    heart_rate_min INTEGER,
    cadence_avg INTEGER,
    cadence_max INTEGER,
    cadence_min INTEGER,
    temperature DOUBLE,
    weather_type VARCHAR,
    humidity DOUBLE,
    wind_speed DOUBLE
);

CREATE TABLE IF NOT EXISTS splits (
    activity_id BIGINT NOT NULL,
    mile_number INTEGER NOT NULL,
    duration VARCHAR NOT NULL,
    pace VARCHAR NOT NULL,
    heart_rate_avg INTEGER,
    cadence_avg INTEGER,
    PRIMARY KEY (activity_id, mile_number)
);

CREATE TABLE IF NOT EXISTS pushups (
    date VARCHAR NOT NULL,
    count INTEGER NOT NULL
);
";

const DROP_TABLES: &str = "
DROP TABLE IF EXISTS splits;
DROP TABLE IF EXISTS runs;
DROP TABLE IF EXISTS pushups;
";

/// Create any missing tables.
pub fn create_tables(conn: &Connection) -> duckdb::Result<()> {
    conn.execute_batch(CREATE_TABLES)
}

/// Drop all tables and recreate them empty, in one transaction.
pub fn recreate_tables(conn: &mut Connection) -> duckdb::Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(DROP_TABLES)?;
    tx.execute_batch(CREATE_TABLES)?;
    tx.commit()
}
