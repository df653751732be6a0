//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET /{code}`   - Short link redirect (routing-table lookup only)
//! - `GET /healthz`  - Liveness probe
//! - `GET /readyz`   - Readiness probe (gated on the cold-start rebuild)
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Path normalization** - Trailing slash handling

use crate::api::handlers::{healthz_handler, readyz_handler, redirect_handler};
use crate::api::middleware::tracing;
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Constructs the application router with all routes and middleware.
///
/// `state` carries the single routing-table instance shared with the
/// reconcile workers.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    let router = Router::new()
        .route("/{code}", get(redirect_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .with_state(state)
        .layer(tracing::layer());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}
