//! Handlers for health and readiness probes.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, LivenessResponse, ReadinessChecks, ReadinessResponse};
use crate::state::AppState;

/// Reports process liveness.
///
/// # Endpoint
///
/// `GET /healthz`
///
/// Always 200 while the process can answer at all; restart decisions belong
/// to the supervisor, not this handler.
pub async fn healthz_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Reports readiness to serve redirects.
///
/// # Endpoint
///
/// `GET /readyz`
///
/// # Response Codes
///
/// - **200 OK**: the cold-start routing table rebuild has completed
/// - **503 Service Unavailable**: still rebuilding; traffic must wait
pub async fn readyz_handler(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let table_check = check_routing_table(&state).await;
    let ready = table_check.status == "ok";

    let response = ReadinessResponse {
        status: if ready { "ready" } else { "not_ready" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: ReadinessChecks {
            routing_table: table_check,
        },
    };

    if ready {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

/// Checks whether the routing table finished its initial rebuild.
async fn check_routing_table(state: &AppState) -> CheckStatus {
    if state.table.is_ready() {
        CheckStatus {
            status: "ok".to_string(),
            message: Some(format!("{} routes", state.table.len().await)),
        }
    } else {
        CheckStatus {
            status: "error".to_string(),
            message: Some("initial rebuild in progress".to_string()),
        }
    }
}
