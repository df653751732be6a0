mod common;

use std::sync::Arc;

use axum::{Router, routing::get};
use axum_test::TestServer;
use serde_json::Value;
use shortlink_operator::api::handlers::{healthz_handler, readyz_handler};
use shortlink_operator::infrastructure::routing::RoutingTable;

fn probe_router(table: Arc<RoutingTable>) -> Router {
    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .with_state(common::test_state(table))
}

#[tokio::test]
async fn test_healthz_always_ok() {
    // Liveness does not depend on the rebuild gate.
    let table = Arc::new(RoutingTable::new());
    let server = TestServer::new(probe_router(table)).unwrap();

    let response = server.get("/healthz").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_readyz_gated_on_rebuild() {
    let table = Arc::new(RoutingTable::new());
    let server = TestServer::new(probe_router(table.clone())).unwrap();

    let response = server.get("/readyz").await;
    assert_eq!(response.status_code(), 503);
    let body: Value = response.json();
    assert_eq!(body["status"], "not_ready");
    assert_eq!(body["checks"]["routing_table"]["status"], "error");

    table.mark_ready();

    let response = server.get("/readyz").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["routing_table"]["status"], "ok");
}
