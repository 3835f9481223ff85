use std::sync::Arc;

use autodeploy_pipeline::{PipelineEngine, RundeckRunner};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Rundeck client plus the job slot catalog, for direct job triggers
    /// and log retrieval.
    pub rundeck: Arc<RundeckRunner>,
    /// Queue engine running server-side deployments.
    pub engine: Arc<PipelineEngine>,
}
