//! In-memory declarative store with watch/list semantics.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tokio::sync::{RwLock, broadcast, mpsc};
use tracing::debug;

use crate::domain::entities::{ShortLink, ShortLinkSpec, WatchEvent};
use crate::domain::repositories::{LinkStore, StoreError};
use async_trait::async_trait;

/// Buffered events per watch subscriber. A subscriber that falls further
/// behind than this receives a watch error and must resync.
const WATCH_BUFFER: usize = 256;

/// In-process [`LinkStore`] implementation.
///
/// Objects are versioned by generation: every spec change bumps it, and
/// [`LinkStore::update_status`] fails with [`StoreError::Conflict`] when the
/// generation moved since the caller's read. Watch subscribers are fed from
/// a broadcast channel; lagging subscribers get a [`WatchEvent::Error`] in
/// place of the lost history.
///
/// Also exposes the writer-side CRUD an external actor uses to declare
/// links ([`MemoryLinkStore::create`], [`MemoryLinkStore::update_spec`],
/// [`MemoryLinkStore::delete`]).
pub struct MemoryLinkStore {
    objects: RwLock<HashMap<String, ShortLink>>,
    events: broadcast::Sender<WatchEvent>,
    /// Store-wide revision counter backing `ShortLink::resource_version`.
    revision: AtomicI64,
    unavailable: AtomicBool,
}

impl Default for MemoryLinkStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(WATCH_BUFFER);
        Self {
            objects: RwLock::new(HashMap::new()),
            events,
            revision: AtomicI64::new(0),
            unavailable: AtomicBool::new(false),
        }
    }

    fn next_revision(&self) -> i64 {
        self.revision.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Declares a new ShortLink. Fails if the code is already taken.
    pub async fn create(&self, spec: ShortLinkSpec) -> Result<ShortLink, StoreError> {
        self.check_available()?;
        let mut objects = self.objects.write().await;
        if objects.contains_key(&spec.code) {
            return Err(StoreError::AlreadyExists(spec.code));
        }

        let mut link = ShortLink::new(spec);
        link.resource_version = self.next_revision();
        objects.insert(link.name.clone(), link.clone());
        debug!(code = %link.name, "shortlink created");
        let _ = self.events.send(WatchEvent::Added(link.clone()));
        Ok(link)
    }

    /// Replaces the declared target, bumping the generation when it changes.
    pub async fn update_spec(&self, code: &str, target: String) -> Result<ShortLink, StoreError> {
        self.check_available()?;
        let mut objects = self.objects.write().await;
        let link = objects
            .get_mut(code)
            .ok_or_else(|| StoreError::NotFound(code.to_string()))?;

        if link.spec.target != target {
            link.spec.target = target;
            link.generation += 1;
            link.resource_version = self.next_revision();
            debug!(code, generation = link.generation, "shortlink spec updated");
        }

        let updated = link.clone();
        let _ = self.events.send(WatchEvent::Modified(updated.clone()));
        Ok(updated)
    }

    /// Removes the object entirely.
    pub async fn delete(&self, code: &str) -> Result<(), StoreError> {
        self.check_available()?;
        let removed = self
            .objects
            .write()
            .await
            .remove(code)
            .ok_or_else(|| StoreError::NotFound(code.to_string()))?;

        debug!(code, "shortlink deleted");
        let _ = self.events.send(WatchEvent::Deleted(removed));
        Ok(())
    }

    /// Pushes a terminal error to every watch subscriber, forcing a resync.
    pub fn emit_watch_error(&self, reason: &str) {
        let _ = self.events.send(WatchEvent::Error(reason.to_string()));
    }

    /// Toggles simulated outage: while set, every store call returns
    /// [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn get(&self, code: &str) -> Result<Option<ShortLink>, StoreError> {
        self.check_available()?;
        Ok(self.objects.read().await.get(code).cloned())
    }

    async fn list(&self) -> Result<Vec<ShortLink>, StoreError> {
        self.check_available()?;
        Ok(self.objects.read().await.values().cloned().collect())
    }

    async fn watch(&self) -> Result<mpsc::Receiver<WatchEvent>, StoreError> {
        self.check_available()?;
        let mut subscription = self.events.subscribe();
        let (tx, rx) = mpsc::channel(WATCH_BUFFER);

        tokio::spawn(async move {
            loop {
                match subscription.recv().await {
                    Ok(event) => {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        // History is gone; the consumer must list-resync.
                        let error = WatchEvent::Error(format!("watch lagged by {missed} events"));
                        if tx.send(error).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(rx)
    }

    async fn update_status(&self, link: &ShortLink) -> Result<(), StoreError> {
        self.check_available()?;
        let mut objects = self.objects.write().await;
        let stored = objects
            .get_mut(&link.name)
            .ok_or_else(|| StoreError::NotFound(link.name.clone()))?;

        if stored.generation != link.generation {
            return Err(StoreError::Conflict {
                code: link.name.clone(),
            });
        }

        stored.status = link.status.clone();
        stored.resource_version = self.next_revision();
        let updated = stored.clone();
        drop(objects);
        let _ = self.events.send(WatchEvent::Modified(updated));
        Ok(())
    }
}
