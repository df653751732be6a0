#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use shortlink_operator::application::services::{ControllerConfig, Reconciler, SyncController};
use shortlink_operator::config::RedirectPolicy;
use shortlink_operator::domain::entities::{RouteEntry, ShortLinkSpec};
use shortlink_operator::domain::repositories::StoreError;
use shortlink_operator::infrastructure::routing::RoutingTable;
use shortlink_operator::infrastructure::store::MemoryLinkStore;
use shortlink_operator::state::AppState;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub fn spec(code: &str, target: &str) -> ShortLinkSpec {
    ShortLinkSpec {
        code: code.to_string(),
        target: target.to_string(),
    }
}

pub fn test_state(table: Arc<RoutingTable>) -> AppState {
    AppState::new(table, RedirectPolicy::Temporary)
}

pub fn test_schemes() -> Vec<String> {
    vec!["http".to_string(), "https".to_string()]
}

/// A table pre-marked ready with the given routes, for handler tests.
pub async fn ready_table(routes: &[(&str, &str)]) -> Arc<RoutingTable> {
    let table = Arc::new(RoutingTable::new());
    for (code, target) in routes {
        table.put(RouteEntry::new(*code, *target, 1)).await;
    }
    table.mark_ready();
    table
}

/// Fast backoff so failure-path tests converge quickly.
pub fn test_controller_config() -> ControllerConfig {
    ControllerConfig {
        workers: 2,
        backoff_base: Duration::from_millis(10),
        backoff_cap: Duration::from_millis(100),
    }
}

/// A running controller wired to an in-memory store.
pub struct Harness {
    pub store: Arc<MemoryLinkStore>,
    pub table: Arc<RoutingTable>,
    pub shutdown: watch::Sender<bool>,
    pub controller: JoinHandle<Result<(), StoreError>>,
}

pub async fn start_controller() -> Harness {
    start_controller_with(Arc::new(MemoryLinkStore::new())).await
}

pub async fn start_controller_with(store: Arc<MemoryLinkStore>) -> Harness {
    let table = Arc::new(RoutingTable::new());
    let reconciler = Arc::new(Reconciler::new(
        store.clone(),
        table.clone(),
        test_schemes(),
        None,
    ));
    let controller = Arc::new(SyncController::new(
        store.clone(),
        table.clone(),
        reconciler,
        test_controller_config(),
    ));

    let (shutdown, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(controller.run(shutdown_rx));

    let gate = table.clone();
    assert!(
        eventually(move || {
            let gate = gate.clone();
            async move { gate.is_ready() }
        })
        .await,
        "controller never opened the readiness gate"
    );

    Harness {
        store,
        table,
        shutdown,
        controller: handle,
    }
}

/// Polls `condition` every 10ms until it holds or ~2s pass.
pub async fn eventually<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
