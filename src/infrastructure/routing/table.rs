//! Concurrent, read-optimized routing table fed by the reconciler.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::entities::RouteEntry;

/// The servable `code -> target` projection.
///
/// Written only by reconcile workers, read concurrently by every in-flight
/// redirect request. Readers never block each other; writers hold the lock
/// only for the map operation itself, never across I/O.
///
/// The table starts not-ready: [`RoutingTable::mark_ready`] is called once
/// the initial full rebuild from a list snapshot completes, and `/readyz`
/// gates traffic on it.
#[derive(Default)]
pub struct RoutingTable {
    entries: RwLock<HashMap<String, RouteEntry>>,
    ready: AtomicBool,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes an entry, overwriting any previous one for the code.
    ///
    /// A publish with a version older than the stored entry is rejected and
    /// returns `false`; this protects against out-of-order reconcile
    /// completions after concurrent watch replays. Re-publishing the same
    /// version is accepted (reconcile passes are idempotent).
    pub async fn put(&self, entry: RouteEntry) -> bool {
        let mut entries = self.entries.write().await;
        if let Some(existing) = entries.get(&entry.code)
            && existing.version > entry.version
        {
            debug!(
                code = %entry.code,
                stored = existing.version,
                offered = entry.version,
                "rejected stale route publish"
            );
            return false;
        }
        entries.insert(entry.code.clone(), entry);
        true
    }

    /// Removes the entry for `code`. Returns whether one existed.
    pub async fn remove(&self, code: &str) -> bool {
        self.entries.write().await.remove(code).is_some()
    }

    /// Resolves a code to its target, if one is published.
    pub async fn lookup(&self, code: &str) -> Option<String> {
        self.entries.read().await.get(code).map(|e| e.target.clone())
    }

    /// Returns the full entry for `code`.
    pub async fn entry(&self, code: &str) -> Option<RouteEntry> {
        self.entries.read().await.get(code).cloned()
    }

    /// Drops entries whose code has no backing object in a list snapshot.
    /// Returns how many were removed.
    pub async fn prune(&self, live: &HashSet<String>) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|code, _| live.contains(code));
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Opens the cold-start gate once the initial rebuild is complete.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_put_and_lookup() {
        let table = RoutingTable::new();

        assert!(table.put(RouteEntry::new("go", "https://go.dev", 1)).await);
        assert_eq!(table.lookup("go").await.as_deref(), Some("https://go.dev"));
        assert_eq!(table.lookup("missing").await, None);
    }

    #[tokio::test]
    async fn test_put_overwrites_with_newer_version() {
        let table = RoutingTable::new();

        table.put(RouteEntry::new("go", "https://a.example", 1)).await;
        assert!(table.put(RouteEntry::new("go", "https://b.example", 2)).await);

        assert_eq!(
            table.lookup("go").await.as_deref(),
            Some("https://b.example")
        );
    }

    #[tokio::test]
    async fn test_put_rejects_older_version() {
        let table = RoutingTable::new();

        table.put(RouteEntry::new("go", "https://b.example", 2)).await;
        assert!(!table.put(RouteEntry::new("go", "https://a.example", 1)).await);

        // Table stays at V2: no regression.
        let entry = table.entry("go").await.unwrap();
        assert_eq!(entry.target, "https://b.example");
        assert_eq!(entry.version, 2);
    }

    #[tokio::test]
    async fn test_put_same_version_is_idempotent() {
        let table = RoutingTable::new();

        table.put(RouteEntry::new("go", "https://go.dev", 3)).await;
        assert!(table.put(RouteEntry::new("go", "https://go.dev", 3)).await);
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let table = RoutingTable::new();

        table.put(RouteEntry::new("go", "https://go.dev", 1)).await;
        assert!(table.remove("go").await);
        assert!(!table.remove("go").await);
        assert_eq!(table.lookup("go").await, None);
    }

    #[tokio::test]
    async fn test_prune_drops_dead_codes() {
        let table = RoutingTable::new();

        table.put(RouteEntry::new("keep", "https://a.example", 1)).await;
        table.put(RouteEntry::new("drop", "https://b.example", 1)).await;

        let live: HashSet<String> = ["keep".to_string()].into_iter().collect();
        assert_eq!(table.prune(&live).await, 1);

        assert!(table.lookup("keep").await.is_some());
        assert!(table.lookup("drop").await.is_none());
    }

    #[tokio::test]
    async fn test_readiness_gate() {
        let table = RoutingTable::new();

        assert!(!table.is_ready());
        table.mark_ready();
        assert!(table.is_ready());
    }

    #[tokio::test]
    async fn test_concurrent_lookups_see_whole_entries() {
        let table = Arc::new(RoutingTable::new());
        table.put(RouteEntry::new("go", "https://a.example", 1)).await;

        let writer = {
            let table = table.clone();
            tokio::spawn(async move {
                for version in 2..50 {
                    let target = if version % 2 == 0 {
                        "https://a.example"
                    } else {
                        "https://b.example"
                    };
                    table.put(RouteEntry::new("go", target, version)).await;
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut readers = Vec::new();
        for _ in 0..4 {
            let table = table.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..100 {
                    // Either the old target or the new one, never a mix.
                    let target = table.lookup("go").await.unwrap();
                    assert!(target == "https://a.example" || target == "https://b.example");
                    tokio::task::yield_now().await;
                }
            }));
        }

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
    }
}
