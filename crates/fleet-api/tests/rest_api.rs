//! REST API integration tests.
//!
//! Drives the full router against a fake runtime: node discovery,
//! lifecycle transitions, file round trips, and error status mapping.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use fleet_api::{FleetController, build_router};
use fleet_core::{AuditAction, FleetConfig, MemoryAudit};
use fleet_runtime::{FakeOp, FakeRuntime};

struct TestFleet {
    fake: Arc<FakeRuntime>,
    audit: Arc<MemoryAudit>,
    controller: FleetController,
    router: Router,
    _staging: tempfile::TempDir,
}

fn test_fleet(nodes: &[&str], running: bool) -> TestFleet {
    let fake = Arc::new(FakeRuntime::with_nodes(nodes.iter().copied(), running));
    let audit = Arc::new(MemoryAudit::new());
    let staging = tempfile::tempdir().unwrap();

    let mut config = FleetConfig::scaffold(nodes);
    config.runtime.timeout = "200ms".into();
    config.health.timeout = "100ms".into();
    config.staging.dir = Some(staging.path().to_path_buf());

    let controller = FleetController::new(&config, fake.clone(), audit.clone());
    let router = build_router(controller.clone());
    TestFleet {
        fake,
        audit,
        controller,
        router,
        _staging: staging,
    }
}

async fn send(router: &Router, method: &str, uri: &str, body: Body) -> (StatusCode, Vec<u8>) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(body)
        .unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn send_json(router: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let (status, bytes) = send(router, method, uri, Body::empty()).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn list_nodes_reports_registration_order() {
    let fleet = test_fleet(&["n1", "n2", "n3"], false);

    let (status, json) = send_json(&fleet.router, "GET", "/api/v1/nodes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let ids: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["n1", "n2", "n3"]);
    assert_eq!(json["data"][0]["status"], "stopped");
}

#[tokio::test]
async fn select_on_cold_fleet_is_unavailable() {
    let fleet = test_fleet(&["n1"], false);

    let (status, json) = send_json(&fleet.router, "GET", "/api/v1/nodes/select").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("no healthy node"));
}

#[tokio::test]
async fn select_round_robins_after_discovery() {
    let fleet = test_fleet(&["n1", "n2"], true);
    fleet.controller.refresh().await;

    let mut picks = Vec::new();
    for _ in 0..4 {
        let (status, json) = send_json(&fleet.router, "GET", "/api/v1/nodes/select").await;
        assert_eq!(status, StatusCode::OK);
        picks.push(json["data"]["node"].as_str().unwrap().to_string());
    }
    assert_eq!(picks, vec!["n1", "n2", "n1", "n2"]);

    let (_, stats) = send_json(&fleet.router, "GET", "/api/v1/stats").await;
    assert_eq!(stats["data"]["total"], 2);
    assert_eq!(stats["data"]["running"], 2);
    assert_eq!(stats["data"]["selections"], 4);
}

#[tokio::test]
async fn start_and_stop_node() {
    let fleet = test_fleet(&["n1"], false);

    let (status, json) = send_json(&fleet.router, "POST", "/api/v1/nodes/n1/start").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "running");
    assert!(fleet.fake.is_running("n1"));

    let (status, json) = send_json(&fleet.router, "POST", "/api/v1/nodes/n1/start").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["success"], false);

    let (status, json) = send_json(&fleet.router, "POST", "/api/v1/nodes/n1/stop").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "stopped");

    assert_eq!(
        fleet.audit.actions(),
        vec![
            AuditAction::NodeStarting,
            AuditAction::NodeStarted,
            AuditAction::NodeStopping,
            AuditAction::NodeStopped,
        ]
    );
}

#[tokio::test]
async fn unknown_node_is_not_found() {
    let fleet = test_fleet(&["n1"], false);
    let (status, _) = send_json(&fleet.router, "POST", "/api/v1/nodes/ghost/start").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failed_start_is_bad_gateway() {
    let fleet = test_fleet(&["n1"], false);
    fleet.fake.fail("n1", FakeOp::Start, 1);

    let (status, json) = send_json(&fleet.router, "POST", "/api/v1/nodes/n1/start").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["error"].as_str().unwrap().contains("start command failed"));
}

#[tokio::test]
async fn hung_runtime_is_gateway_timeout() {
    let fleet = test_fleet(&["n1"], false);
    fleet.fake.set_hanging("n1", true);

    let (status, _) = send_json(&fleet.router, "POST", "/api/v1/nodes/n1/start").await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);

    let (_, json) = send_json(&fleet.router, "GET", "/api/v1/nodes").await;
    assert_eq!(json["data"][0]["status"], "unreachable");
}

#[tokio::test]
async fn file_round_trip() {
    let fleet = test_fleet(&["n1", "n2"], true);
    fleet.controller.refresh().await;

    let (status, bytes) = send(
        &fleet.router,
        "POST",
        "/api/v1/files/hello.txt",
        Body::from("hello"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["data"]["node"], "n1");
    assert_eq!(json["data"]["bytes"], 5);

    let (status, body) = send(&fleet.router, "GET", "/api/v1/files/hello.txt", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"hello");

    let (status, bytes) = send(
        &fleet.router,
        "POST",
        "/api/v1/files/hello.txt",
        Body::from("again"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(json["error"].as_str().unwrap().contains("already exists"));

    let (status, bytes) = send(
        &fleet.router,
        "PUT",
        "/api/v1/files/hello.txt",
        Body::from("hello, world"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["data"]["node"], "n1");
    assert_eq!(json["data"]["bytes"], 12);

    let (_, body) = send(&fleet.router, "GET", "/api/v1/files/hello.txt", Body::empty()).await;
    assert_eq!(body, b"hello, world");

    let (status, _) = send_json(&fleet.router, "DELETE", "/api/v1/files/hello.txt").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(&fleet.router, "GET", "/api/v1/files/hello.txt").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_without_running_node_is_unavailable() {
    let fleet = test_fleet(&["n1"], false);

    let (status, _) = send(&fleet.router, "POST", "/api/v1/files/a.txt", Body::from("x")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(fleet.fake.calls_for(FakeOp::CopyIn), 0);
}

#[tokio::test]
async fn failed_upload_is_bad_gateway() {
    let fleet = test_fleet(&["n1"], true);
    fleet.controller.refresh().await;
    fleet.fake.fail("n1", FakeOp::CopyIn, 1);

    let (status, _) = send(&fleet.router, "POST", "/api/v1/files/a.txt", Body::from("x")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn path_like_filenames_are_rejected() {
    let fleet = test_fleet(&["n1"], true);
    fleet.controller.refresh().await;

    for uri in ["/api/v1/files/%2E%2E", "/api/v1/files/a%2Fb", "/api/v1/files/a%5Cb"] {
        let (status, json) = send_json(&fleet.router, "GET", uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(json["error"].as_str().unwrap().contains("invalid filename"));
    }
    let (status, _) = send(&fleet.router, "POST", "/api/v1/files/a%2Fb", Body::from("x")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(fleet.fake.calls_for(FakeOp::CopyIn), 0);
}

#[tokio::test]
async fn stopped_owner_makes_file_unavailable() {
    let fleet = test_fleet(&["n1", "n2"], true);
    fleet.controller.refresh().await;

    send(&fleet.router, "POST", "/api/v1/files/a.txt", Body::from("x")).await;
    let (status, _) = send_json(&fleet.router, "POST", "/api/v1/nodes/n1/stop").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(&fleet.router, "GET", "/api/v1/files/a.txt").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn stopped_node_rejoins_rotation_after_restart() {
    let fleet = test_fleet(&["n1", "n2"], true);
    fleet.controller.refresh().await;

    let (status, _) = send_json(&fleet.router, "POST", "/api/v1/nodes/n2/stop").await;
    assert_eq!(status, StatusCode::OK);
    fleet.controller.refresh().await;
    let (_, json) = send_json(&fleet.router, "GET", "/api/v1/nodes").await;
    assert_eq!(json["data"][1]["status"], "stopped");

    for _ in 0..3 {
        let (_, json) = send_json(&fleet.router, "GET", "/api/v1/nodes/select").await;
        assert_eq!(json["data"]["node"], "n1");
    }

    let (status, _) = send_json(&fleet.router, "POST", "/api/v1/nodes/n2/start").await;
    assert_eq!(status, StatusCode::OK);
    let mut picks = Vec::new();
    for _ in 0..2 {
        let (_, json) = send_json(&fleet.router, "GET", "/api/v1/nodes/select").await;
        picks.push(json["data"]["node"].as_str().unwrap().to_string());
    }
    picks.sort();
    assert_eq!(picks, vec!["n1", "n2"]);
}

#[tokio::test]
async fn update_of_missing_file_is_not_found() {
    let fleet = test_fleet(&["n1"], true);
    fleet.controller.refresh().await;

    let (status, _) = send(&fleet.router, "PUT", "/api/v1/files/none.txt", Body::from("x")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(fleet.fake.calls_for(FakeOp::CopyIn), 0);
}
