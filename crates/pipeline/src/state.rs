//! Observable state of deployments and their steps.

use autodeploy_core::job_slot::JobSlot;
use autodeploy_core::plan::{DeploymentKind, DeploymentPlan};
use autodeploy_core::types::ExecutionId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Aborted,
    /// Never started because an earlier step did not succeed.
    Skipped,
}

impl StepStatus {
    pub fn is_finished(self) -> bool {
        !matches!(self, StepStatus::Pending | StepStatus::Running)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSnapshot {
    pub key: String,
    pub label: String,
    pub slot: JobSlot,
    pub depends_on: Vec<String>,
    pub status: StepStatus,
    pub execution_id: Option<ExecutionId>,
    /// Raw Rundeck status from the latest poll.
    pub rundeck_status: Option<String>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSnapshot {
    pub id: Uuid,
    pub kind: DeploymentKind,
    pub target: String,
    pub status: DeploymentStatus,
    pub steps: Vec<StepSnapshot>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl DeploymentSnapshot {
    /// Fresh snapshot for `plan` with every step pending.
    pub fn from_plan(id: Uuid, plan: &DeploymentPlan) -> Self {
        let steps = plan
            .steps
            .iter()
            .map(|step| StepSnapshot {
                key: step.key.clone(),
                label: step.label.clone(),
                slot: step.slot,
                depends_on: step.depends_on.clone(),
                status: StepStatus::Pending,
                execution_id: None,
                rundeck_status: None,
                error: None,
                started_at: None,
                finished_at: None,
            })
            .collect();

        Self {
            id,
            kind: plan.kind,
            target: plan.target.clone(),
            status: DeploymentStatus::Running,
            steps,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status != DeploymentStatus::Running
    }

    pub fn step(&self, key: &str) -> Option<&StepSnapshot> {
        self.steps.iter().find(|s| s.key == key)
    }
}
