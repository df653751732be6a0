use std::sync::Arc;

use crate::config::RedirectPolicy;
use crate::infrastructure::routing::RoutingTable;

/// Shared state injected into HTTP handlers.
///
/// The routing table is the single instance also written by the reconcile
/// workers; handlers never reach past it to the declarative store.
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<RoutingTable>,
    pub redirect: RedirectPolicy,
}

impl AppState {
    pub fn new(table: Arc<RoutingTable>, redirect: RedirectPolicy) -> Self {
        Self { table, redirect }
    }
}
