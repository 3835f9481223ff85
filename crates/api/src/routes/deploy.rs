//! Route definitions for the `/deploy` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::deploy;
use crate::state::AppState;

/// Routes mounted at `/deploy`.
///
/// ```text
/// POST   /                -> start_deploy
/// POST   /{slot}          -> trigger_slot
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(deploy::start_deploy))
        .route("/{slot}", post(deploy::trigger_slot))
}
