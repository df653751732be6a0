//! # ShortLink Operator
//!
//! A declarative short-link service built with Axum and Tokio: ShortLink
//! objects declare `code -> target` mappings, a reconciliation loop converges
//! them into an in-memory routing table, and an HTTP handler serves the table
//! as redirects.
//!
//! ## Architecture
//!
//! This crate follows Clean Architecture principles with clear layer separation:
//!
//! - **Domain Layer** ([`domain`]) - ShortLink data model and the store trait
//! - **Application Layer** ([`application`]) - Reconciler, controller, work queue
//! - **Infrastructure Layer** ([`infrastructure`]) - Routing table and store implementations
//! - **API Layer** ([`api`]) - Redirect handler and probes
//!
//! ## Data Flow
//!
//! ```text
//! store mutation -> watch event -> controller enqueues code
//!   -> reconciler validates target, writes status, updates routing table
//!   -> GET /{code} reads the routing table and redirects
//! ```
//!
//! The redirect path never touches the store: once the cold-start rebuild
//! completes, lookups are a single read-lock acquisition regardless of store
//! health.
//!
//! ## Quick Start
//!
//! ```bash
//! # Optional: declarations to serve immediately
//! export LINKS_FILE="links.json"
//!
//! # Start the service
//! cargo run
//! ```
//!
//! ## Configuration
//!
//! Service configuration is loaded from environment variables via
//! [`config::Config`]. See [`config`] module for available options.

pub mod api;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod metrics;
pub mod state;
pub mod utils;

pub mod config;
pub mod server;

pub mod routes;

pub use error::AppError;
pub use state::AppState;

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library users
/// and integration tests.
pub mod prelude {
    pub use crate::application::services::{
        ControllerConfig, ReconcileOutcome, Reconciler, SyncController,
    };
    pub use crate::config::RedirectPolicy;
    pub use crate::domain::entities::{LinkCondition, RouteEntry, ShortLink, ShortLinkSpec};
    pub use crate::domain::repositories::{LinkStore, StoreError};
    pub use crate::error::AppError;
    pub use crate::infrastructure::routing::RoutingTable;
    pub use crate::infrastructure::store::MemoryLinkStore;
    pub use crate::state::AppState;
}
