//! Route definitions for the `/jobs` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// GET    /{execution_id}       -> get_execution
/// GET    /{execution_id}/log   -> get_execution_log
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{execution_id}", get(jobs::get_execution))
        .route("/{execution_id}/log", get(jobs::get_execution_log))
}
