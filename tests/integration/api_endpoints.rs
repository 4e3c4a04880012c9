//! Integration tests for the HTTP API against a spawned server
//!
//! These tests verify that:
//! - The six external operations behave over real HTTP
//! - Error responses carry the right status and an `error` body
//! - Stats include persistence counters when a storage actor runs

use std::net::SocketAddr;

use host_monitor::{
    actors::StorageHandle,
    api::{ApiState, spawn_api_server},
    config::ApiConfig,
    monitor::Monitor,
    storage::MemoryBackend,
};
use reqwest::StatusCode;
use serde_json::{Value, json};

use crate::helpers::*;

async fn spawn_test_api(monitor: Monitor, storage: Option<StorageHandle>) -> SocketAddr {
    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        enable_cors: true,
    };

    spawn_api_server(&config, ApiState::new(monitor, storage))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_dashboard_flow() {
    let monitor = create_monitor(100, vec![cpu_threshold(80.0)]);
    let addr = spawn_test_api(monitor.clone(), None).await;
    let client = reqwest::Client::new();
    let base = format!("http://{addr}/api/v1");

    let response = client.get(format!("{base}/metrics/current")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());

    monitor.record(create_sample(1, 70.0)).await.unwrap();
    monitor.record(create_sample(2, 85.0)).await.unwrap();

    let current: Value = client
        .get(format!("{base}/metrics/current"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(current["cpu_percent"], 85.0);

    let alerts: Value = client
        .get(format!("{base}/alerts"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(alerts["alerts"][0]["status"], "triggered");
    assert_eq!(alerts["alerts"][0]["last_value"], 85.0);

    let response = client
        .put(format!("{base}/thresholds"))
        .json(&json!({"metric": "disk:/data", "limit_percent": 95.0}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .put(format!("{base}/disks/visible"))
        .json(&json!({"visible_disks": {"mode": "only", "mount_points": ["/data"]}}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let history: Value = client
        .get(format!("{base}/metrics/history"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history["count"], 2);
    assert_eq!(history["disks"]["mode"], "only");
    let disks = history["samples"][1]["disks"].as_object().unwrap();
    assert!(disks.contains_key("/data"));
    assert!(!disks.contains_key("/"));

    let response = client
        .delete(format!("{base}/thresholds"))
        .query(&[("metric", "cpu")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let thresholds: Value = client
        .get(format!("{base}/thresholds"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(thresholds["count"], 1);
    assert_eq!(thresholds["thresholds"][0]["metric"], "disk:/data");
}

#[tokio::test]
async fn test_stats_and_health_with_storage() {
    let monitor = create_monitor(100, vec![]);
    let storage = StorageHandle::spawn(
        monitor.subscribe_samples(),
        Box::new(MemoryBackend::new()),
        None,
    );
    let addr = spawn_test_api(monitor.clone(), Some(storage.clone())).await;
    let client = reqwest::Client::new();

    monitor.record(create_sample(1, 10.0)).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    storage.flush().await.unwrap();

    let stats: Value = client
        .get(format!("http://{addr}/api/v1/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["store"]["retained"], 1);
    assert_eq!(stats["storage"]["total_persisted"], 1);
    assert_eq!(stats["storage"]["backend"]["backend"], "memory");

    let health: Value = client
        .get(format!("http://{addr}/api/v1/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["storage"]["healthy"], true);

    storage.shutdown().await;
}

#[tokio::test]
async fn test_unknown_threshold_delete_is_not_found() {
    let addr = spawn_test_api(create_monitor(10, vec![]), None).await;

    let response = reqwest::Client::new()
        .delete(format!("http://{addr}/api/v1/thresholds?metric=memory"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("memory"));
}
