//! Reconciliation engine services.

pub mod controller;
pub mod reconciler;
pub mod work_queue;

pub use controller::{ControllerConfig, SyncController};
pub use reconciler::{ReconcileError, ReconcileOutcome, Reconciler};
pub use work_queue::WorkQueue;
