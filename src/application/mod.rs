//! Application layer implementing the synchronization engine.
//!
//! This layer connects the declarative store to the routing table: the
//! controller turns watch events into queued reconcile keys, and the
//! reconciler converges one object per pass.
//!
//! # Available Services
//!
//! - [`services::reconciler::Reconciler`] - Per-object state machine
//! - [`services::controller::SyncController`] - Watch loop, resync, worker pool
//! - [`services::work_queue::WorkQueue`] - Deduplicating single-flight key queue

pub mod services;
