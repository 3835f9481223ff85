//! The deployment queue engine.
//!
//! A deployment walks its plan in waves: every pending step whose
//! dependencies have all succeeded is triggered at once, and the engine
//! then waits for whichever running step finishes next. After the first
//! step that does not succeed no new steps are triggered; steps already
//! running are still awaited, and whatever never started is marked
//! skipped. Job triggers are never retried.

use std::sync::Arc;
use std::time::Duration;

use autodeploy_core::error::CoreError;
use autodeploy_core::plan::{DeploymentPlan, PlanStep};
use autodeploy_core::types::ExecutionId;
use autodeploy_rundeck::{Execution, ExecutionStatus};
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::events::{DeploymentEvent, EventBus};
use crate::registry::{DeploymentRegistry, DEFAULT_MAX_RETAINED};
use crate::runner::JobRunner;
use crate::state::{DeploymentSnapshot, DeploymentStatus, StepStatus};

/// Tunables for polling running executions.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Delay between status checks of a running execution.
    pub poll_interval: Duration,
    /// A step still running after this long is failed.
    pub step_timeout: Duration,
    /// Consecutive failed status checks tolerated before a step is failed.
    pub max_poll_errors: u32,
    /// Finished deployments kept in the registry.
    pub max_retained: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            step_timeout: Duration::from_secs(2 * 60 * 60),
            max_poll_errors: 10,
            max_retained: DEFAULT_MAX_RETAINED,
        }
    }
}

/// How a single step ended.
#[derive(Debug)]
struct StepOutcome {
    status: StepStatus,
    execution_id: Option<ExecutionId>,
    rundeck_status: Option<String>,
    error: Option<String>,
}

impl StepOutcome {
    fn failed(execution_id: Option<ExecutionId>, error: String) -> Self {
        Self {
            status: StepStatus::Failed,
            execution_id,
            rundeck_status: None,
            error: Some(error),
        }
    }

    fn aborted(execution_id: Option<ExecutionId>, error: &str) -> Self {
        Self {
            status: StepStatus::Aborted,
            execution_id,
            rundeck_status: None,
            error: Some(error.to_string()),
        }
    }

    /// Map a terminal Rundeck execution onto a step outcome.
    fn from_execution(execution: &Execution) -> Self {
        let (status, error) = match execution.status {
            ExecutionStatus::Succeeded => (StepStatus::Succeeded, None),
            ExecutionStatus::Aborted => (
                StepStatus::Aborted,
                Some(format!("Execution {} was aborted", execution.id)),
            ),
            ref other => (
                StepStatus::Failed,
                Some(format!("Execution {} ended with status {other}", execution.id)),
            ),
        };

        Self {
            status,
            execution_id: Some(execution.id),
            rundeck_status: Some(execution.status.to_string()),
            error,
        }
    }
}

/// Spawns and drives deployments.
///
/// Created once at startup; the returned `Arc` is cloned into request
/// handlers.
pub struct PipelineEngine {
    runner: Arc<dyn JobRunner>,
    registry: Arc<DeploymentRegistry>,
    events: Arc<EventBus>,
    config: EngineConfig,
    /// Cancelled during shutdown; running steps stop polling.
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl PipelineEngine {
    pub fn new(runner: Arc<dyn JobRunner>, config: EngineConfig) -> Arc<Self> {
        Arc::new(Self {
            runner,
            registry: Arc::new(DeploymentRegistry::new(config.max_retained)),
            events: Arc::new(EventBus::default()),
            config,
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
        })
    }

    pub fn registry(&self) -> &Arc<DeploymentRegistry> {
        &self.registry
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Register `plan` as a new deployment and run it in the background.
    ///
    /// Returns the initial snapshot (every step pending).
    pub async fn start(self: &Arc<Self>, plan: DeploymentPlan) -> Result<DeploymentSnapshot, CoreError> {
        // Held from before the shutdown check until the deployment finishes,
        // so `shutdown` cannot return while a registration is in flight.
        let guard = self.tracker.token();
        let snapshot = self.register(&plan).await?;
        let engine = Arc::clone(self);
        let id = snapshot.id;
        self.tracker.spawn(async move {
            engine.execute(id, &plan).await;
            drop(guard);
        });
        Ok(snapshot)
    }

    /// Register `plan` and run it to completion on the current task.
    pub async fn run(&self, plan: DeploymentPlan) -> Result<DeploymentSnapshot, CoreError> {
        let _guard = self.tracker.token();
        let id = self.register(&plan).await?.id;
        self.execute(id, &plan).await;
        self.registry.get(id).await.ok_or_else(|| CoreError::NotFound {
            entity: "Deployment",
            id: id.to_string(),
        })
    }

    /// Cancel running deployments and wait for their tasks to wind down.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        tracing::info!("Pipeline engine stopped");
    }

    // ---- private helpers ----

    async fn register(&self, plan: &DeploymentPlan) -> Result<DeploymentSnapshot, CoreError> {
        if self.cancel.is_cancelled() {
            return Err(CoreError::Conflict("Server is shutting down".into()));
        }
        plan.validate()?;

        let id = Uuid::new_v4();
        let snapshot = DeploymentSnapshot::from_plan(id, plan);
        self.registry.insert(snapshot.clone()).await;

        self.events.publish(DeploymentEvent::DeploymentStarted {
            deployment_id: id,
            kind: plan.kind,
            target: plan.target.clone(),
            steps: plan.steps.iter().map(|s| s.key.clone()).collect(),
        });
        tracing::info!(
            deployment_id = %id,
            kind = ?plan.kind,
            target = %plan.target,
            steps = plan.steps.len(),
            "Deployment registered",
        );

        Ok(snapshot)
    }

    async fn execute(&self, id: Uuid, plan: &DeploymentPlan) {
        let mut statuses = vec![StepStatus::Pending; plan.steps.len()];
        let mut halted = false;
        let mut in_flight = FuturesUnordered::new();

        loop {
            if !halted && !self.cancel.is_cancelled() {
                for (idx, step) in plan.steps.iter().enumerate() {
                    if statuses[idx] != StepStatus::Pending || !dependencies_met(plan, step, &statuses) {
                        continue;
                    }
                    statuses[idx] = StepStatus::Running;
                    self.mark_running(id, idx).await;
                    in_flight.push(async move { (idx, self.run_step(id, idx, step).await) });
                }
            }

            let Some((idx, outcome)) = in_flight.next().await else {
                break;
            };
            statuses[idx] = outcome.status;
            if outcome.status != StepStatus::Succeeded {
                halted = true;
            }
            self.record_outcome(id, idx, &plan.steps[idx], outcome).await;
        }

        for (idx, step) in plan.steps.iter().enumerate() {
            if statuses[idx] == StepStatus::Pending {
                statuses[idx] = StepStatus::Skipped;
                self.record_outcome(
                    id,
                    idx,
                    step,
                    StepOutcome {
                        status: StepStatus::Skipped,
                        execution_id: None,
                        rundeck_status: None,
                        error: None,
                    },
                )
                .await;
            }
        }

        let status = if statuses.iter().all(|s| *s == StepStatus::Succeeded) {
            DeploymentStatus::Succeeded
        } else {
            DeploymentStatus::Failed
        };
        self.registry.finish(id, status).await;
        self.events.publish(DeploymentEvent::DeploymentFinished {
            deployment_id: id,
            status,
        });
        tracing::info!(deployment_id = %id, ?status, "Deployment finished");
    }

    /// Trigger one step's job and follow its execution to the end.
    async fn run_step(&self, id: Uuid, idx: usize, step: &PlanStep) -> StepOutcome {
        let triggered = tokio::select! {
            _ = self.cancel.cancelled() => {
                return StepOutcome::aborted(None, "Deployment cancelled before the job was triggered");
            }
            result = self.runner.trigger(step.slot, &step.options) => result,
        };

        let execution = match triggered {
            Ok(execution) => execution,
            Err(e) => {
                tracing::warn!(
                    deployment_id = %id,
                    step = %step.key,
                    slot = %step.slot,
                    error = %e,
                    "Job trigger failed",
                );
                return StepOutcome::failed(None, format!("{} trigger failed: {e}", step.slot));
            }
        };

        let execution_id = execution.id;
        let rundeck_status = execution.status.to_string();
        self.registry
            .update_step(id, idx, |s| {
                s.execution_id = Some(execution_id);
                s.rundeck_status = Some(rundeck_status);
            })
            .await;
        self.events.publish(DeploymentEvent::StepStarted {
            deployment_id: id,
            step: step.key.clone(),
            slot: step.slot,
            execution_id,
        });
        tracing::info!(
            deployment_id = %id,
            step = %step.key,
            slot = %step.slot,
            execution_id,
            "Step triggered",
        );

        if execution.status.is_terminal() {
            return StepOutcome::from_execution(&execution);
        }
        self.poll_until_terminal(id, idx, execution_id).await
    }

    /// Poll an execution until Rundeck reports a terminal status.
    ///
    /// After a failed status check the next one waits twice as long.
    async fn poll_until_terminal(&self, id: Uuid, idx: usize, execution_id: ExecutionId) -> StepOutcome {
        let deadline = Instant::now() + self.config.step_timeout;
        let mut delay = self.config.poll_interval;
        let mut consecutive_errors = 0u32;
        let mut last_status: Option<ExecutionStatus> = None;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    return StepOutcome::aborted(
                        Some(execution_id),
                        "Deployment cancelled while the job was running",
                    );
                }
                _ = tokio::time::sleep(delay) => {}
            }

            if Instant::now() >= deadline {
                return StepOutcome::failed(
                    Some(execution_id),
                    format!(
                        "Execution {execution_id} did not finish within {}s",
                        self.config.step_timeout.as_secs()
                    ),
                );
            }

            match self.runner.status(execution_id).await {
                Ok(execution) => {
                    consecutive_errors = 0;
                    delay = self.config.poll_interval;

                    if last_status.as_ref() != Some(&execution.status) {
                        let status = execution.status.to_string();
                        self.registry
                            .update_step(id, idx, |s| s.rundeck_status = Some(status))
                            .await;
                        last_status = Some(execution.status.clone());
                    }

                    if execution.status.is_terminal() {
                        return StepOutcome::from_execution(&execution);
                    }
                }
                Err(e) => {
                    consecutive_errors += 1;
                    tracing::warn!(
                        deployment_id = %id,
                        execution_id,
                        attempt = consecutive_errors,
                        error = %e,
                        "Execution status check failed",
                    );

                    if consecutive_errors >= self.config.max_poll_errors {
                        return StepOutcome::failed(
                            Some(execution_id),
                            format!(
                                "Lost track of execution {execution_id} after {consecutive_errors} failed status checks: {e}"
                            ),
                        );
                    }
                    delay = self.config.poll_interval * 2;
                }
            }
        }
    }

    async fn mark_running(&self, id: Uuid, idx: usize) {
        self.registry
            .update_step(id, idx, |s| {
                s.status = StepStatus::Running;
                s.started_at = Some(Utc::now());
            })
            .await;
    }

    async fn record_outcome(&self, id: Uuid, idx: usize, step: &PlanStep, outcome: StepOutcome) {
        let StepOutcome {
            status,
            execution_id,
            rundeck_status,
            error,
        } = outcome;

        if status != StepStatus::Succeeded && status != StepStatus::Skipped {
            tracing::warn!(
                deployment_id = %id,
                step = %step.key,
                ?status,
                error = error.as_deref().unwrap_or_default(),
                "Step did not succeed",
            );
        } else {
            tracing::debug!(deployment_id = %id, step = %step.key, ?status, "Step finished");
        }

        let event_error = error.clone();
        self.registry
            .update_step(id, idx, |s| {
                s.status = status;
                if execution_id.is_some() {
                    s.execution_id = execution_id;
                }
                if rundeck_status.is_some() {
                    s.rundeck_status = rundeck_status;
                }
                s.error = error;
                s.finished_at = Some(Utc::now());
            })
            .await;

        self.events.publish(DeploymentEvent::StepFinished {
            deployment_id: id,
            step: step.key.clone(),
            status,
            execution_id,
            error: event_error,
        });
    }
}

/// Whether every dependency of `step` has succeeded.
fn dependencies_met(plan: &DeploymentPlan, step: &PlanStep, statuses: &[StepStatus]) -> bool {
    step.depends_on.iter().all(|dep| {
        plan.position(dep)
            .is_some_and(|i| statuses[i] == StepStatus::Succeeded)
    })
}
