//! Tests for the stats aggregator

mod common;

use common::memory_service;

#[tokio::test]
async fn fresh_service_reports_zeroes_and_never() {
    let service = memory_service().await;

    let stats = service.stats().compute().await.unwrap();
    assert!(!stats.connected);
    assert_eq!(stats.total_present, 0);
    assert_eq!(stats.total_motion_detected, 0);
    assert_eq!(stats.last_motion_time, "Never");
}

#[tokio::test]
async fn counters_follow_the_logs() {
    let service = memory_service().await;

    // Two distinct present tags, one duplicate, one unauthorized
    service.process_line("UID: AA:BB:CC:DD").await.unwrap();
    service.process_line("UID: 01:2D:3D:2E").await.unwrap();
    service.process_line("UID: AA:BB:CC:DD").await.unwrap();
    service.process_line("UID: DE:AD:BE:EF").await.unwrap();

    service.process_line("Motion detected!").await.unwrap();
    service.process_line("Movement!").await.unwrap();

    let stats = service.stats().compute().await.unwrap();
    assert_eq!(stats.total_present, 2);
    assert_eq!(stats.total_motion_detected, 2);
    assert_ne!(stats.last_motion_time, "Never");
}

#[tokio::test]
async fn unauthorized_rows_do_not_count_as_present() {
    let service = memory_service().await;

    service.process_line("UID: DE:AD:BE:EF").await.unwrap();
    service.process_line("UID: DE:AD:BE:EF").await.unwrap();

    let stats = service.stats().compute().await.unwrap();
    assert_eq!(stats.total_present, 0);
}

#[tokio::test]
async fn stats_serialize_with_camel_case_keys() {
    let service = memory_service().await;

    let stats = service.stats().compute().await.unwrap();
    let value = serde_json::to_value(&stats).unwrap();
    assert!(value.get("totalPresent").is_some());
    assert!(value.get("totalMotionDetected").is_some());
    assert!(value.get("lastMotionTime").is_some());
    assert!(value.get("connected").is_some());
}
