// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request};
use fitlog::config::Config;
use fitlog::db::{ConnectOptions, Store};
use fitlog::routes::create_router;
use fitlog::AppState;
use std::sync::Arc;
use tempfile::TempDir;

pub const TEST_API_KEY: &str = "test-api-key";

/// Config pointing at a fresh database in a temp dir.
#[allow(dead_code)]
pub fn test_config(dir: &TempDir) -> Config {
    Config {
        db_path: dir.path().join("fitlog.db"),
        env_file: dir.path().join(".env"),
        ..Default::default()
    }
}

/// Create a test app over a temp-dir store.
/// Returns the router, the shared state and the temp dir (keep it alive).
#[allow(dead_code)]
pub async fn create_test_app() -> (axum::Router, Arc<AppState>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let (app, state) = create_test_app_with(config).await;
    (app, state, dir)
}

#[allow(dead_code)]
pub async fn create_test_app_with(config: Config) -> (axum::Router, Arc<AppState>) {
    let store = Store::open(&config, ConnectOptions::default())
        .await
        .expect("Failed to open test store");
    let state = Arc::new(AppState { config, store });
    (create_router(state.clone()), state)
}

/// Authenticated request, with a JSON body when one is given.
#[allow(dead_code)]
pub fn api_request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-API-Key", TEST_API_KEY);

    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[allow(dead_code)]
pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
