//! Tests for the HTTP API surface

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::memory_service;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn get(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post(app: &axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_reports_disconnected_channel() {
    let service = memory_service().await;
    let app = classwatch::http_api::router(service);

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connected"], false);
}

#[tokio::test]
async fn register_user_requires_uid_and_name() {
    let service = memory_service().await;
    let app = classwatch::http_api::router(service);

    let (status, body) = post(&app, "/users", json!({ "uid": "AB:CD:EF:01" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "UID and name are required");
}

#[tokio::test]
async fn register_user_uppercases_uid() {
    let service = memory_service().await;
    let app = classwatch::http_api::router(service);

    let (status, body) = post(
        &app,
        "/users",
        json!({ "uid": "ab:cd:ef:01", "name": "New Student" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, users) = get(&app, "/users").await;
    let uids: Vec<&str> = users
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["uid"].as_str().unwrap())
        .collect();
    assert!(uids.contains(&"AB:CD:EF:01"));
}

#[tokio::test]
async fn simulate_rfid_walks_the_present_then_duplicate_path() {
    let service = memory_service().await;
    let app = classwatch::http_api::router(service);

    let (status, body) = post(
        &app,
        "/simulate",
        json!({ "type": "rfid", "data": "AA:BB:CC:DD" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["result"], "present");
    assert_eq!(body["results"][0]["name"], "Alice");

    let (_, body) = post(
        &app,
        "/simulate",
        json!({ "type": "rfid", "data": "AA:BB:CC:DD" }),
    )
    .await;
    assert_eq!(body["results"][0]["result"], "duplicate");

    // The duplicate shows up in the buffer with its detection timestamp
    let (_, duplicates) = get(&app, "/duplicates").await;
    let duplicates = duplicates.as_array().unwrap();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0]["uid"], "AA:BB:CC:DD");
    assert!(duplicates[0]["timestamp"].is_string());

    // One attendance row in spite of two scans
    let (_, attendance) = get(&app, "/attendance").await;
    assert_eq!(attendance.as_array().unwrap().len(), 1);

    let (_, body) = post(&app, "/duplicates/clear", json!({})).await;
    assert_eq!(body["success"], true);
    let (_, duplicates) = get(&app, "/duplicates").await;
    assert!(duplicates.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn simulate_unknown_uid_is_unauthorized() {
    let service = memory_service().await;
    let app = classwatch::http_api::router(service);

    let (_, body) = post(
        &app,
        "/simulate",
        json!({ "type": "rfid", "data": "DE:AD:BE:EF" }),
    )
    .await;
    assert_eq!(body["results"][0]["result"], "unauthorized");
}

#[tokio::test]
async fn simulate_rejects_unknown_type() {
    let service = memory_service().await;
    let app = classwatch::http_api::router(service);

    let (status, _) = post(&app, "/simulate", json!({ "type": "earthquake" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn simulate_noise_lands_in_the_noise_log() {
    let service = memory_service().await;
    let app = classwatch::http_api::router(service);

    let (_, body) = post(&app, "/simulate", json!({ "type": "noise", "data": "42.3" })).await;
    assert_eq!(body["results"][0]["status"], "Noise");

    let (_, logs) = get(&app, "/logs").await;
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["dB"], 42.3);
    assert_eq!(logs[0]["status"], "Noise");
}

#[tokio::test]
async fn simulate_motion_updates_motion_log_and_stats() {
    let service = memory_service().await;
    let app = classwatch::http_api::router(service);

    post(&app, "/simulate", json!({ "type": "motion" })).await;
    post(
        &app,
        "/simulate",
        json!({ "type": "rfid", "data": "AA:BB:CC:DD" }),
    )
    .await;

    let (_, motion) = get(&app, "/motion").await;
    assert_eq!(motion.as_array().unwrap().len(), 1);

    let (_, stats) = get(&app, "/stats").await;
    assert_eq!(stats["totalPresent"], 1);
    assert_eq!(stats["totalMotionDetected"], 1);
    assert!(stats["lastMotionTime"].is_string());
    assert_ne!(stats["lastMotionTime"], "Never");
}

#[tokio::test]
async fn attendance_is_listed_newest_first() {
    let service = memory_service().await;
    let app = classwatch::http_api::router(service);

    post(
        &app,
        "/simulate",
        json!({ "type": "rfid", "data": "AA:BB:CC:DD" }),
    )
    .await;
    post(
        &app,
        "/simulate",
        json!({ "type": "rfid", "data": "01:2D:3D:2E" }),
    )
    .await;

    let (_, attendance) = get(&app, "/attendance").await;
    let rows = attendance.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], "Bob");
    assert_eq!(rows[1]["name"], "Alice");
}
