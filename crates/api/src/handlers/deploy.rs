//! Handlers for the `/deploy` resource.
//!
//! These trigger a single Rundeck job and return immediately with its
//! execution id, leaving sequencing to the caller. Server-side sequencing
//! lives under `/deployments`.

use autodeploy_core::cluster::ClusterDeployRequest;
use autodeploy_core::error::CoreError;
use autodeploy_core::job_slot::JobSlot;
use autodeploy_core::plan::{vm_options, VmDeployRequest};
use autodeploy_core::types::{ExecutionId, JobOptions};
use autodeploy_core::vm_name::validate_vm_name;
use autodeploy_pipeline::JobRunner;
use autodeploy_rundeck::Execution;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

/// The part of a Rundeck execution the console tracks.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRef {
    pub execution_id: ExecutionId,
    pub href: Option<String>,
    pub status: String,
}

impl From<Execution> for ExecutionRef {
    fn from(exec: Execution) -> Self {
        Self {
            execution_id: exec.id,
            href: exec.href,
            status: exec.status.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployResponse {
    pub vm_name: String,
    pub join_domain: bool,
    pub job1: ExecutionRef,
    /// Always `null`: job2 is triggered separately once job1 succeeds.
    pub job2: Option<ExecutionRef>,
}

/// Body for the per-host job slots.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlotRequest {
    pub vm_name: String,
}

// ---------------------------------------------------------------------------
// POST /deploy
// ---------------------------------------------------------------------------

/// POST /api/deploy
///
/// Validate the VM form and trigger job1 (provisioning). Returns the
/// execution so the caller can poll it.
pub async fn start_deploy(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<VmDeployRequest>,
) -> AppResult<Json<DeployResponse>> {
    let vm_name = validate_vm_name("vmName", &input.vm_name)?;

    let exec = state
        .rundeck
        .trigger(JobSlot::Job1, &vm_options(&vm_name))
        .await?;

    tracing::info!(
        vm_name = %vm_name,
        join_domain = input.join_domain,
        execution_id = exec.id,
        "Provisioning started",
    );

    Ok(Json(DeployResponse {
        vm_name,
        join_domain: input.join_domain,
        job1: exec.into(),
        job2: None,
    }))
}

// ---------------------------------------------------------------------------
// POST /deploy/{slot}
// ---------------------------------------------------------------------------

/// POST /api/deploy/{slot}
///
/// Trigger one of job2..job8. `job7` takes the cluster form; every other
/// slot takes `{ "vmName": ... }`. Responds with `{ "<slot>": execution }`.
pub async fn trigger_slot(
    State(state): State<AppState>,
    ApiPath(slot): ApiPath<String>,
    ApiJson(body): ApiJson<serde_json::Value>,
) -> AppResult<Json<serde_json::Value>> {
    let slot: JobSlot = slot.parse()?;
    if slot == JobSlot::Job1 {
        return Err(AppError::Core(CoreError::Validation(
            "job1 is started through POST /api/deploy".into(),
        )));
    }

    let options = slot_options(slot, body)?;
    let exec = state.rundeck.trigger(slot, &options).await?;

    tracing::info!(%slot, execution_id = exec.id, "Job triggered");

    let mut response = serde_json::Map::new();
    response.insert(
        slot.key(),
        serde_json::to_value(ExecutionRef::from(exec))
            .map_err(|e| AppError::InternalError(e.to_string()))?,
    );
    Ok(Json(serde_json::Value::Object(response)))
}

/// Validate the request body for `slot` and build its job options.
fn slot_options(slot: JobSlot, body: serde_json::Value) -> AppResult<JobOptions> {
    if slot.takes_cluster_options() {
        let req: ClusterDeployRequest = serde_json::from_value(body)
            .map_err(|e| AppError::BadRequest(format!("Invalid cluster request: {e}")))?;
        return Ok(req.validate()?.job_options());
    }

    let req: SlotRequest = serde_json::from_value(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request: {e}")))?;
    let vm_name = validate_vm_name("vmName", &req.vm_name)?;
    Ok(vm_options(&vm_name))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn vm_slots_sanitize_the_name() {
        let opts = slot_options(JobSlot::Job2, json!({ "vmName": "WinProto02" })).unwrap();
        assert_eq!(opts["vm_name"], "winproto02");
    }

    #[test]
    fn vm_slot_without_name_is_rejected() {
        assert_matches!(
            slot_options(JobSlot::Job5, json!({})),
            Err(AppError::Core(CoreError::Validation(msg))) if msg == "vmName is required"
        );
    }

    #[test]
    fn cluster_slot_validates_the_whole_form() {
        let body = json!({
            "node1Name": "n1",
            "node2Name": "n2",
            "clusterName": "CL",
            "clusterIp": "10.0.0.50",
            "agName": "AG",
            "listenerName": "LSN",
            "listenerIp": "10.0.0.51",
        });
        let opts = slot_options(JobSlot::Job7, body).unwrap();
        assert_eq!(opts["cluster_name"], "CL");

        assert_matches!(
            slot_options(JobSlot::Job7, json!({ "node1Name": "n1" })),
            Err(AppError::Core(CoreError::Validation(_)))
        );
    }

    #[test]
    fn malformed_body_is_a_bad_request() {
        assert_matches!(
            slot_options(JobSlot::Job3, json!({ "vmName": 12 })),
            Err(AppError::BadRequest(_))
        );
    }
}
