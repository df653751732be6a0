//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde_json::json;
use tracing::debug;

use crate::config::RedirectPolicy;
use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short code to its declared target.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// # Request Flow
///
/// A single routing-table lookup decides the response; the declarative store
/// is never consulted on the request path, so latency stays bounded and
/// independent of store health. Misses (unknown code, deleted or invalid
/// shortlink) all fail closed to 404.
///
/// # Errors
///
/// Returns 404 Not Found if no route is published for the code.
#[tracing::instrument(name = "resolve", skip_all, fields(code = %code, outcome = tracing::field::Empty))]
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    match state.table.lookup(&code).await {
        Some(target) => {
            tracing::Span::current().record("outcome", "hit");
            crate::metrics::record_redirect(true);
            debug!(%code, %target, "redirect hit");

            let status = match state.redirect {
                RedirectPolicy::Permanent => StatusCode::MOVED_PERMANENTLY,
                RedirectPolicy::Temporary => StatusCode::FOUND,
            };
            Ok((status, [(header::LOCATION, target)]))
        }
        None => {
            tracing::Span::current().record("outcome", "miss");
            crate::metrics::record_redirect(false);
            debug!(%code, "redirect miss");

            Err(AppError::not_found(
                "Short link not found",
                json!({ "code": code }),
            ))
        }
    }
}
