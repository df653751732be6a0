//! DTOs for health and readiness endpoints.

use serde::Serialize;

/// Liveness response: the process is up and serving.
#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: String,
    pub version: String,
}

/// Readiness response with component status.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub version: String,
    pub checks: ReadinessChecks,
}

/// Readiness status for each gated component.
#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    pub routing_table: CheckStatus,
}

/// Individual component status.
#[derive(Debug, Serialize)]
pub struct CheckStatus {
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
