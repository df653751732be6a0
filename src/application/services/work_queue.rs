//! Deduplicating keyed work queue with per-key single-flight.

use std::collections::{HashSet, VecDeque};
use tokio::sync::{Mutex, Notify};

#[derive(Default)]
struct QueueState {
    order: VecDeque<String>,
    queued: HashSet<String>,
    active: HashSet<String>,
    dirty: HashSet<String>,
    shut_down: bool,
}

/// Queue of reconcile keys feeding the worker pool.
///
/// Guarantees:
/// - a key waiting in the queue is never queued twice (duplicates collapse);
/// - a key handed to a worker is not handed to another until
///   [`WorkQueue::done`] is called for it (single-flight per key);
/// - a key re-added while being processed is marked dirty and re-queued as
///   soon as its pass completes, so no event is lost to the collapse.
///
/// The reconciler always re-fetches the object, so a collapsed pass acts on
/// the latest observed state regardless of how many events folded into it.
#[derive(Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    wakeup: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a key for reconciliation.
    pub async fn add(&self, key: &str) {
        let mut state = self.state.lock().await;
        if state.shut_down {
            return;
        }
        if state.active.contains(key) {
            state.dirty.insert(key.to_string());
            return;
        }
        if state.queued.insert(key.to_string()) {
            state.order.push_back(key.to_string());
            drop(state);
            self.wakeup.notify_one();
        }
    }

    /// Waits for the next key. Returns `None` once the queue is shut down
    /// and drained of waiters.
    pub async fn next(&self) -> Option<String> {
        loop {
            {
                let mut state = self.state.lock().await;
                if let Some(key) = state.order.pop_front() {
                    state.queued.remove(&key);
                    state.active.insert(key.clone());
                    if !state.order.is_empty() {
                        // Cascade: Notify holds a single permit, so wake the
                        // next waiter for the remaining work.
                        self.wakeup.notify_one();
                    }
                    return Some(key);
                }
                if state.shut_down {
                    return None;
                }
            }
            self.wakeup.notified().await;
        }
    }

    /// Marks a pass complete and re-queues the key if events arrived while
    /// it was being processed.
    pub async fn done(&self, key: &str) {
        let mut state = self.state.lock().await;
        state.active.remove(key);
        if state.dirty.remove(key) && !state.shut_down && state.queued.insert(key.to_string()) {
            state.order.push_back(key.to_string());
            drop(state);
            self.wakeup.notify_one();
        }
    }

    /// Stops the queue: pending keys are dropped and blocked callers of
    /// [`WorkQueue::next`] return `None`.
    pub async fn shut_down(&self) {
        let mut state = self.state.lock().await;
        state.shut_down = true;
        state.order.clear();
        state.queued.clear();
        drop(state);
        self.wakeup.notify_waiters();
    }

    /// Whether nothing is queued or being processed.
    pub async fn is_idle(&self) -> bool {
        let state = self.state.lock().await;
        state.order.is_empty() && state.active.is_empty()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.order.len()
    }
}
