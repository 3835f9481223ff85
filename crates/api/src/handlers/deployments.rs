//! Handlers for the `/deployments` resource.
//!
//! A deployment is a whole VM or cluster build sequenced on the server by
//! the pipeline engine. Starting one returns immediately with the initial
//! snapshot; progress is read back here or streamed over `/ws`.

use autodeploy_core::cluster::ClusterDeployRequest;
use autodeploy_core::error::CoreError;
use autodeploy_core::plan::{DeploymentPlan, VmDeployRequest};
use autodeploy_pipeline::DeploymentSnapshot;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::extract::{ApiJson, ApiPath};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Check every slot in `plan` has a Rundeck job, then hand it to the engine.
async fn launch(state: &AppState, plan: DeploymentPlan) -> AppResult<DeploymentSnapshot> {
    let catalog = state.rundeck.catalog();
    for step in &plan.steps {
        catalog.resolve(step.slot)?;
    }

    let snapshot = state.engine.start(plan).await?;

    tracing::info!(
        deployment_id = %snapshot.id,
        kind = ?snapshot.kind,
        target = %snapshot.target,
        steps = snapshot.steps.len(),
        "Deployment started",
    );
    Ok(snapshot)
}

// ---------------------------------------------------------------------------
// Start
// ---------------------------------------------------------------------------

/// POST /api/deployments/vm
///
/// Start a single-VM deployment. Returns 202 with the initial snapshot.
pub async fn start_vm(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<VmDeployRequest>,
) -> AppResult<impl IntoResponse> {
    let plan = DeploymentPlan::for_vm(&input)?;
    let snapshot = launch(&state, plan).await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: snapshot })))
}

/// POST /api/deployments/cluster
///
/// Start a two-node SQL cluster deployment. Returns 202 with the initial
/// snapshot.
pub async fn start_cluster(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ClusterDeployRequest>,
) -> AppResult<impl IntoResponse> {
    let spec = input.validate()?;
    let plan = DeploymentPlan::for_cluster(&spec)?;
    let snapshot = launch(&state, plan).await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: snapshot })))
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// GET /api/deployments
///
/// Running and recently finished deployments, newest first.
pub async fn list_deployments(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<DeploymentSnapshot>>>> {
    let deployments = state.engine.registry().list().await;
    Ok(Json(DataResponse { data: deployments }))
}

/// GET /api/deployments/{id}
pub async fn get_deployment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<DataResponse<DeploymentSnapshot>>> {
    let snapshot = state
        .engine
        .registry()
        .get(id)
        .await
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Deployment",
            id: id.to_string(),
        }))?;
    Ok(Json(DataResponse { data: snapshot }))
}
