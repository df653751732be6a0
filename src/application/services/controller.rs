//! Synchronization controller: turns watch events into reconcile passes.
//!
//! One watch-consumer task feeds a deduplicating keyed queue; a small worker
//! pool drains it, reconciling distinct codes in parallel while the queue
//! keeps per-code work single-flight. Watch-stream loss triggers a full list
//! resync before consuming again.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, info, warn};

use crate::application::services::reconciler::Reconciler;
use crate::application::services::work_queue::WorkQueue;
use crate::domain::entities::WatchEvent;
use crate::domain::repositories::{LinkStore, StoreError};
use crate::infrastructure::routing::RoutingTable;

/// Tuning for the controller loop.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Reconcile workers draining the queue in parallel (distinct codes).
    pub workers: usize,
    /// First requeue delay after a failed pass.
    pub backoff_base: Duration,
    /// Requeue delay ceiling.
    pub backoff_cap: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(300),
        }
    }
}

/// Exponential backoff delay for the given 1-based attempt.
fn backoff_delay(base: Duration, cap: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    base.saturating_mul(1u32 << exponent).min(cap)
}

/// Orchestrates the watch stream, the work queue, and the worker pool.
pub struct SyncController<S: LinkStore> {
    store: Arc<S>,
    table: Arc<RoutingTable>,
    reconciler: Arc<Reconciler<S>>,
    queue: Arc<WorkQueue>,
    /// Consecutive failed passes per code, for requeue backoff.
    failures: Mutex<HashMap<String, u32>>,
    config: ControllerConfig,
}

impl<S: LinkStore + 'static> SyncController<S> {
    pub fn new(
        store: Arc<S>,
        table: Arc<RoutingTable>,
        reconciler: Arc<Reconciler<S>>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            store,
            table,
            reconciler,
            queue: Arc::new(WorkQueue::new()),
            failures: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Runs until `shutdown` flips to `true` (or its sender drops).
    ///
    /// Performs the cold-start rebuild, opens the readiness gate, then keeps
    /// the routing table converged with the store. In-flight passes finish
    /// before this returns.
    ///
    /// # Errors
    ///
    /// Only a non-transient initial list failure can fail this function; once
    /// the gate is open, store errors are retried internally and never escape.
    pub async fn run(
        self: Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), StoreError> {
        // Subscribe before the initial list: changes racing the rebuild
        // buffer on the stream instead of being lost.
        let Some(events) = self.subscribe(&mut shutdown).await else {
            return Ok(());
        };

        // Cold start: rebuild the full table before serving any traffic.
        if self.initial_rebuild(&mut shutdown).await? {
            return Ok(());
        }
        self.table.mark_ready();
        let routes = self.table.len().await;
        info!(routes, "initial rebuild complete, ready to serve");

        let mut workers = Vec::with_capacity(self.config.workers.max(1));
        for worker_id in 0..self.config.workers.max(1) {
            let controller = Arc::clone(&self);
            workers.push(tokio::spawn(async move {
                controller.worker_loop(worker_id).await;
            }));
        }

        self.watch_loop(events, &mut shutdown).await;

        // Drain: stop handing out keys, let in-flight passes finish.
        self.queue.shut_down().await;
        for worker in workers {
            let _ = worker.await;
        }
        info!("controller stopped");
        Ok(())
    }

    /// Opens a watch stream, backing off while the store is unreachable.
    /// Returns `None` when shutdown fires first.
    async fn subscribe(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Option<mpsc::Receiver<WatchEvent>> {
        let mut attempts: u32 = 0;
        loop {
            match self.store.watch().await {
                Ok(events) => return Some(events),
                Err(err) => {
                    attempts += 1;
                    let delay =
                        backoff_delay(self.config.backoff_base, self.config.backoff_cap, attempts);
                    warn!(error = %err, ?delay, "watch subscribe failed, backing off");
                    if wait_or_shutdown(shutdown, delay).await {
                        return None;
                    }
                }
            }
        }
    }

    /// Lists the store and reconciles every object inline, retrying the
    /// snapshot with backoff while the store is unreachable. Returns `true`
    /// when shutdown fired before the rebuild finished.
    async fn initial_rebuild(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<bool, StoreError> {
        let mut attempts: u32 = 0;
        let links = loop {
            match self.store.list().await {
                Ok(links) => break links,
                Err(err) if err.is_transient() => {
                    attempts += 1;
                    let delay =
                        backoff_delay(self.config.backoff_base, self.config.backoff_cap, attempts);
                    warn!(error = %err, ?delay, "initial list failed, backing off");
                    if wait_or_shutdown(shutdown, delay).await {
                        return Ok(true);
                    }
                }
                Err(err) => return Err(err),
            }
        };

        for link in &links {
            if let Err(err) = self.reconciler.reconcile(&link.name).await {
                warn!(code = %link.name, error = %err, "initial reconcile failed, requeueing");
                self.requeue_after_failure(&link.name).await;
            }
        }
        Ok(false)
    }

    /// Consumes watch streams until shutdown, resyncing on stream loss.
    async fn watch_loop(
        &self,
        mut events: mpsc::Receiver<WatchEvent>,
        shutdown: &mut watch::Receiver<bool>,
    ) {
        loop {
            if self.consume_stream(&mut events, shutdown).await {
                return;
            }

            crate::metrics::record_resync();
            let mut attempts: u32 = 0;
            events = loop {
                match self.reestablish().await {
                    Ok(events) => break events,
                    Err(err) => {
                        attempts += 1;
                        let delay = backoff_delay(
                            self.config.backoff_base,
                            self.config.backoff_cap,
                            attempts,
                        );
                        warn!(error = %err, ?delay, "resync failed, backing off");
                        if wait_or_shutdown(shutdown, delay).await {
                            return;
                        }
                    }
                }
            };
        }
    }

    /// Consumes one stream until it errors or closes. Returns `true` when
    /// shutdown fired.
    async fn consume_stream(
        &self,
        events: &mut mpsc::Receiver<WatchEvent>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> bool {
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return true;
                    }
                }
                event = events.recv() => match event {
                    Some(WatchEvent::Added(link)) | Some(WatchEvent::Modified(link)) => {
                        debug!(code = %link.name, "change event observed");
                        self.queue.add(&link.name).await;
                    }
                    Some(WatchEvent::Deleted(link)) => {
                        debug!(code = %link.name, "tombstone event observed");
                        self.queue.add(&link.name).await;
                    }
                    Some(WatchEvent::Bookmark) => {}
                    Some(WatchEvent::Error(reason)) => {
                        warn!(%reason, "watch stream error, resyncing");
                        return false;
                    }
                    None => {
                        warn!("watch stream closed, resyncing");
                        return false;
                    }
                }
            }
        }
    }

    /// Subscribes a fresh stream, then diffs a list snapshot against the
    /// routing table. Subscription comes first so changes racing the resync
    /// buffer on the new stream.
    async fn reestablish(&self) -> Result<mpsc::Receiver<WatchEvent>, StoreError> {
        let events = self.store.watch().await?;

        let links = self.store.list().await?;
        let live: HashSet<String> = links.iter().map(|l| l.name.clone()).collect();

        let pruned = self.table.prune(&live).await;
        if pruned > 0 {
            info!(pruned, "pruned routes with no backing shortlink");
        }

        for link in &links {
            self.queue.add(&link.name).await;
        }
        info!(objects = links.len(), "resync enqueued full snapshot");
        Ok(events)
    }

    async fn worker_loop(&self, worker_id: usize) {
        debug!(worker_id, "reconcile worker started");
        while let Some(code) = self.queue.next().await {
            match self.reconciler.reconcile(&code).await {
                Ok(_) => {
                    self.failures.lock().await.remove(&code);
                }
                Err(err) => {
                    warn!(%code, error = %err, "reconcile failed, scheduling retry");
                    self.requeue_after_failure(&code).await;
                }
            }
            self.queue.done(&code).await;
        }
        debug!(worker_id, "reconcile worker stopped");
    }

    /// Schedules a delayed re-add with per-code exponential backoff.
    async fn requeue_after_failure(&self, code: &str) {
        let attempt = {
            let mut failures = self.failures.lock().await;
            let entry = failures.entry(code.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };
        let delay = backoff_delay(self.config.backoff_base, self.config.backoff_cap, attempt);
        crate::metrics::record_reconcile_retry("backoff");
        debug!(code, attempt, ?delay, "requeueing with backoff");

        let queue = Arc::clone(&self.queue);
        let code = code.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(&code).await;
        });
    }
}

/// Sleeps for `delay` unless shutdown fires first; returns `true` on shutdown.
async fn wait_or_shutdown(shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}
