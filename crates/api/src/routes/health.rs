use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether Rundeck answered the system info request.
    pub rundeck_reachable: bool,
}

/// GET /health -- returns service and Rundeck health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let rundeck_reachable = match state.rundeck.api().system_info().await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Rundeck health check failed");
            false
        }
    };

    let status = if rundeck_reachable { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        rundeck_reachable,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
