// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! fitlog: track runs and pushups
//!
//! This crate provides the DuckDB-backed store (local or replicated to S3),
//! the Smashrun importer, the REST API served by `fitlog serve` and the
//! command-line client that talks to either the store or the API.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Store;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Store,
}
