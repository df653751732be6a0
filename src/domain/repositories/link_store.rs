//! Store trait for declarative ShortLink access.

use crate::domain::entities::{ShortLink, WatchEvent};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Errors returned by the declarative store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("shortlink '{0}' not found")]
    NotFound(String),

    #[error("shortlink '{0}' already exists")]
    AlreadyExists(String),

    /// Optimistic-concurrency clash: the object's generation changed between
    /// the caller's read and its status write.
    #[error("status write for '{code}' conflicts with a newer generation")]
    Conflict { code: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Transient errors are worth retrying with backoff; the rest are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Store interface for ShortLink objects: typed CRUD reads plus watch.
///
/// The store is an external collaborator (an API server in the original
/// deployment); this crate only depends on these operations.
///
/// # Implementations
///
/// - [`crate::infrastructure::store::MemoryLinkStore`] - in-process store
///   with full watch/list semantics
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Fetches the current state of one object.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(link))` if the object exists
    /// - `Ok(None)` if it does not (deleted or never created)
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the store cannot be reached.
    async fn get(&self, code: &str) -> Result<Option<ShortLink>, StoreError>;

    /// Returns a finite snapshot of every object.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the store cannot be reached.
    async fn list(&self) -> Result<Vec<ShortLink>, StoreError>;

    /// Subscribes to change events from now on.
    ///
    /// The returned channel is a lazy, potentially-infinite sequence. It may
    /// yield [`WatchEvent::Error`] (store-side history expired, subscriber
    /// lagged) or close outright; either way the consumer must perform a full
    /// [`LinkStore::list`] resync before watching again.
    async fn watch(&self) -> Result<mpsc::Receiver<WatchEvent>, StoreError>;

    /// Writes back the object's status under optimistic concurrency.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the object's generation changed
    /// since `link` was read; callers must re-fetch and retry.
    /// Returns [`StoreError::NotFound`] if the object was deleted meanwhile.
    async fn update_status(&self, link: &ShortLink) -> Result<(), StoreError>;
}
