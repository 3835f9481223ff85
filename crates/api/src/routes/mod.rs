pub mod deploy;
pub mod deployments;
pub mod health;
pub mod jobs;

use axum::http::Uri;
use axum::routing::get;
use axum::Router;

use crate::error::AppError;
use crate::state::AppState;
use crate::ws;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                                 WebSocket (deployment events)
///
/// /deploy                             trigger job1 for a VM (POST)
/// /deploy/{slot}                      trigger job2..job8 (POST)
///
/// /jobs/{execution_id}                execution status
/// /jobs/{execution_id}/log            execution log output (?offset=)
///
/// /deployments                        list server-side deployments
/// /deployments/vm                     start VM deployment (POST)
/// /deployments/cluster                start cluster deployment (POST)
/// /deployments/{id}                   get deployment
/// ```
///
/// Unmatched `/api` paths get a JSON 404 rather than the frontend.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/deploy", deploy::router())
        .nest("/jobs", jobs::router())
        .nest("/deployments", deployments::router())
        .fallback(api_not_found)
}

async fn api_not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No API route for {}", uri.path()))
}
