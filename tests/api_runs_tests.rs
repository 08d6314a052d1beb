// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end tests for the run, pushup and activity endpoints.

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn test_create_and_fetch_run() {
    let (app, _, _dir) = common::create_test_app().await;

    let response = app
        .clone()
        .oneshot(common::api_request(
            "POST",
            "/runs",
            Some(json!({"duration": "00:28:21", "distance": 3.0, "date": "06/01/25"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = common::read_json(response).await;
    assert_eq!(body["message"], "Run created successfully");
    assert_eq!(body["run"]["duration"], "00:28:21");
    assert_eq!(body["run"]["pace_per_mile"], "00:09:27");
    assert_eq!(body["run"]["date"], "2025-06-01T00:00:00");
    let activity_id = body["run"]["activity_id"].as_i64().unwrap();
    assert!(activity_id > 0);

    let response = app
        .clone()
        .oneshot(common::api_request(
            "GET",
            &format!("/runs/{}", activity_id),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let run = common::read_json(response).await;
    assert_eq!(run["activity_id"], activity_id);
    assert_eq!(run["distance_miles"], 3.0);

    let response = app
        .oneshot(common::api_request("GET", "/runs", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let runs = common::read_json(response).await;
    assert_eq!(runs.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_run_is_not_found() {
    let (app, _, _dir) = common::create_test_app().await;

    let response = app
        .oneshot(common::api_request("GET", "/runs/12345", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = common::read_json(response).await;
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_list_runs_filters_and_limit() {
    let (app, _, _dir) = common::create_test_app().await;

    for date in ["2025-06-01", "2025-06-02", "2025-06-03T18:30:00"] {
        let response = app
            .clone()
            .oneshot(common::api_request(
                "POST",
                "/runs",
                Some(json!({"duration": "00:30:00", "distance": 3.0, "date": date})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(common::api_request(
            "GET",
            "/runs?start_date=2025-06-02&end_date=2025-06-03",
            None,
        ))
        .await
        .unwrap();
    let runs = common::read_json(response).await;
    let dates: Vec<&str> = runs
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["date"].as_str().unwrap())
        .collect();
    assert_eq!(dates, vec!["2025-06-03T18:30:00", "2025-06-02T00:00:00"]);

    let response = app
        .oneshot(common::api_request("GET", "/runs?limit=1", None))
        .await
        .unwrap();
    let runs = common::read_json(response).await;
    assert_eq!(runs.as_array().unwrap().len(), 1);
    assert_eq!(runs[0]["date"], "2025-06-03T18:30:00");
}

#[tokio::test]
async fn test_pushups_and_status() {
    let (app, _, _dir) = common::create_test_app().await;

    for count in [20, 30] {
        let response = app
            .clone()
            .oneshot(common::api_request(
                "POST",
                "/pushups",
                Some(json!({ "count": count })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = common::read_json(response).await;
        assert_eq!(body["message"], "Pushup entry created successfully");
        assert_eq!(body["pushup"]["count"], count);
    }

    let response = app
        .clone()
        .oneshot(common::api_request(
            "POST",
            "/runs",
            Some(json!({"duration": "00:40:00", "distance": 4.0})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(common::api_request("GET", "/activities/status", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::read_json(response).await;
    assert_eq!(body["message"], "Activity status retrieved successfully");
    assert_eq!(body["stats"]["period"]["days"], 30);
    assert_eq!(body["stats"]["runs"]["total"], 1);
    assert_eq!(body["stats"]["runs"]["total_distance"], 4.0);
    assert_eq!(body["stats"]["pushups"]["total"], 2);
    assert_eq!(body["stats"]["pushups"]["total_count"], 50);
    assert_eq!(body["stats"]["pushups"]["avg_count"], 25.0);

    let response = app
        .oneshot(common::api_request("GET", "/activities/report?days=7", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::read_json(response).await;
    assert_eq!(body["report"]["total_runs"], 1);
    assert_eq!(body["report"]["average_pace"], "00:10:00");
}

#[tokio::test]
async fn test_empty_status() {
    let (app, _, _dir) = common::create_test_app().await;

    let response = app
        .oneshot(common::api_request("GET", "/activities/status?days=7", None))
        .await
        .unwrap();
    let body = common::read_json(response).await;
    assert_eq!(body["stats"]["period"]["days"], 7);
    assert_eq!(body["stats"]["runs"]["total"], 0);
    assert_eq!(body["stats"]["runs"]["avg_distance"], 0.0);
    assert_eq!(body["stats"]["pushups"]["avg_count"], 0.0);
}
