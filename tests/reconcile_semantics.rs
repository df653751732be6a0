//! Reconciler semantics against the real in-memory store: state transitions,
//! idempotence, and fail-closed behavior.

mod common;

use std::sync::Arc;

use shortlink_operator::application::services::{ReconcileOutcome, Reconciler};
use shortlink_operator::domain::entities::LinkCondition;
use shortlink_operator::domain::repositories::LinkStore;
use shortlink_operator::infrastructure::routing::RoutingTable;
use shortlink_operator::infrastructure::store::MemoryLinkStore;

struct Fixture {
    store: Arc<MemoryLinkStore>,
    table: Arc<RoutingTable>,
    reconciler: Reconciler<MemoryLinkStore>,
}

fn fixture_with_host(public_host: Option<&str>) -> Fixture {
    let store = Arc::new(MemoryLinkStore::new());
    let table = Arc::new(RoutingTable::new());
    let reconciler = Reconciler::new(
        store.clone(),
        table.clone(),
        common::test_schemes(),
        public_host.map(str::to_string),
    );
    Fixture {
        store,
        table,
        reconciler,
    }
}

fn fixture() -> Fixture {
    fixture_with_host(None)
}

#[tokio::test]
async fn test_valid_link_becomes_ready() {
    let f = fixture();
    f.store
        .create(common::spec("go", "https://go.dev"))
        .await
        .unwrap();

    let outcome = f.reconciler.reconcile("go").await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Published);
    assert_eq!(f.table.lookup("go").await.as_deref(), Some("https://go.dev"));

    let link = f.store.get("go").await.unwrap().unwrap();
    assert_eq!(link.status.condition, LinkCondition::Ready);
    assert_eq!(link.status.resolved_target.as_deref(), Some("https://go.dev"));
    assert_eq!(link.status.last_reconciled_generation, 1);
}

#[tokio::test]
async fn test_invalid_target_becomes_invalid() {
    let f = fixture();
    f.store
        .create(common::spec("bad", "not a url"))
        .await
        .unwrap();

    let outcome = f.reconciler.reconcile("bad").await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Invalidated);
    assert_eq!(f.table.lookup("bad").await, None);

    let link = f.store.get("bad").await.unwrap().unwrap();
    assert_eq!(link.status.condition, LinkCondition::Invalid);
    assert!(link.status.resolved_target.is_none());
    assert!(link.status.reason.is_some());
}

#[tokio::test]
async fn test_reconcile_is_idempotent_per_generation() {
    let f = fixture();
    f.store
        .create(common::spec("go", "https://go.dev"))
        .await
        .unwrap();

    assert_eq!(
        f.reconciler.reconcile("go").await.unwrap(),
        ReconcileOutcome::Published
    );
    let first = f.store.get("go").await.unwrap().unwrap();

    // Same generation again: no duplicate status write, route unchanged.
    assert_eq!(
        f.reconciler.reconcile("go").await.unwrap(),
        ReconcileOutcome::UpToDate
    );
    let second = f.store.get("go").await.unwrap().unwrap();

    assert_eq!(first.status, second.status);
    assert_eq!(f.table.lookup("go").await.as_deref(), Some("https://go.dev"));
}

#[tokio::test]
async fn test_spec_update_republishes_at_new_generation() {
    let f = fixture();
    f.store
        .create(common::spec("go", "https://a.example"))
        .await
        .unwrap();
    f.reconciler.reconcile("go").await.unwrap();

    f.store
        .update_spec("go", "https://b.example".to_string())
        .await
        .unwrap();
    let outcome = f.reconciler.reconcile("go").await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Published);
    assert_eq!(
        f.table.lookup("go").await.as_deref(),
        Some("https://b.example")
    );

    let link = f.store.get("go").await.unwrap().unwrap();
    assert_eq!(link.status.last_reconciled_generation, 2);
    assert_eq!(
        link.status.resolved_target.as_deref(),
        Some("https://b.example")
    );
}

#[tokio::test]
async fn test_ready_link_turning_invalid_fails_closed() {
    let f = fixture();
    f.store
        .create(common::spec("go", "https://go.dev"))
        .await
        .unwrap();
    f.reconciler.reconcile("go").await.unwrap();
    assert!(f.table.lookup("go").await.is_some());

    // New generation with a broken target must stop serving the old one.
    f.store
        .update_spec("go", "not a url".to_string())
        .await
        .unwrap();
    let outcome = f.reconciler.reconcile("go").await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Invalidated);
    assert_eq!(f.table.lookup("go").await, None);

    let link = f.store.get("go").await.unwrap().unwrap();
    assert_eq!(link.status.condition, LinkCondition::Invalid);
}

#[tokio::test]
async fn test_deleted_link_is_removed() {
    let f = fixture();
    f.store
        .create(common::spec("go", "https://go.dev"))
        .await
        .unwrap();
    f.reconciler.reconcile("go").await.unwrap();

    f.store.delete("go").await.unwrap();
    let outcome = f.reconciler.reconcile("go").await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Removed);
    assert_eq!(f.table.lookup("go").await, None);
}

#[tokio::test]
async fn test_delete_and_recreate_serves_the_new_target() {
    let f = fixture();
    f.store
        .create(common::spec("go", "https://a.example"))
        .await
        .unwrap();
    // A few spec bumps so the old object's generation outruns a fresh one.
    f.store
        .update_spec("go", "https://b.example".to_string())
        .await
        .unwrap();
    f.store
        .update_spec("go", "https://c.example".to_string())
        .await
        .unwrap();
    f.reconciler.reconcile("go").await.unwrap();

    f.store.delete("go").await.unwrap();
    f.store
        .create(common::spec("go", "https://fresh.example"))
        .await
        .unwrap();

    // The delete and re-create may collapse into this single pass; the
    // re-created object (generation 1) must still win over the old route.
    let outcome = f.reconciler.reconcile("go").await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Published);
    assert_eq!(
        f.table.lookup("go").await.as_deref(),
        Some("https://fresh.example")
    );
}

#[tokio::test]
async fn test_self_referencing_target_is_invalid() {
    let f = fixture_with_host(Some("sho.rt"));
    f.store
        .create(common::spec("go", "https://sho.rt/go"))
        .await
        .unwrap();

    let outcome = f.reconciler.reconcile("go").await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Invalidated);
    let link = f.store.get("go").await.unwrap().unwrap();
    assert!(
        link.status
            .reason
            .as_deref()
            .is_some_and(|r| r.contains("own short code"))
    );
}

#[tokio::test]
async fn test_invalid_then_fixed_spec_recovers() {
    let f = fixture();
    f.store
        .create(common::spec("go", "not a url"))
        .await
        .unwrap();
    f.reconciler.reconcile("go").await.unwrap();
    assert_eq!(f.table.lookup("go").await, None);

    f.store
        .update_spec("go", "https://go.dev".to_string())
        .await
        .unwrap();
    let outcome = f.reconciler.reconcile("go").await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Published);
    assert_eq!(f.table.lookup("go").await.as_deref(), Some("https://go.dev"));

    let link = f.store.get("go").await.unwrap().unwrap();
    assert_eq!(link.status.condition, LinkCondition::Ready);
    assert!(link.status.reason.is_none());
}
