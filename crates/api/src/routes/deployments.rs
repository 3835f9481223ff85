//! Route definitions for the `/deployments` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::deployments;
use crate::state::AppState;

/// Routes mounted at `/deployments`.
///
/// ```text
/// GET    /                -> list_deployments
/// POST   /vm              -> start_vm
/// POST   /cluster         -> start_cluster
/// GET    /{id}            -> get_deployment
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(deployments::list_deployments))
        .route("/vm", post(deployments::start_vm))
        .route("/cluster", post(deployments::start_cluster))
        .route("/{id}", get(deployments::get_deployment))
}
