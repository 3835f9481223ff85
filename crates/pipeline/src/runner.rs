//! The seam between the engine and the job-orchestration service.

use std::sync::Arc;

use async_trait::async_trait;
use autodeploy_core::error::CoreError;
use autodeploy_core::job_slot::JobSlot;
use autodeploy_core::types::{ExecutionId, JobOptions};
use autodeploy_rundeck::{Execution, JobCatalog, RundeckApi, RundeckApiError};

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The slot cannot be triggered (e.g. no job UUID configured).
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Api(#[from] RundeckApiError),
}

/// Triggers jobs and reports on their executions.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Start the job bound to `slot`.
    async fn trigger(&self, slot: JobSlot, options: &JobOptions) -> Result<Execution, RunnerError>;

    /// Current state of a previously started execution.
    async fn status(&self, execution_id: ExecutionId) -> Result<Execution, RunnerError>;
}

/// [`JobRunner`] backed by a live Rundeck server.
pub struct RundeckRunner {
    api: Arc<RundeckApi>,
    catalog: JobCatalog,
}

impl RundeckRunner {
    pub fn new(api: Arc<RundeckApi>, catalog: JobCatalog) -> Self {
        Self { api, catalog }
    }

    /// The underlying API client, for calls outside the runner contract
    /// (log output, health checks).
    pub fn api(&self) -> &RundeckApi {
        &self.api
    }

    pub fn catalog(&self) -> &JobCatalog {
        &self.catalog
    }
}

#[async_trait]
impl JobRunner for RundeckRunner {
    async fn trigger(&self, slot: JobSlot, options: &JobOptions) -> Result<Execution, RunnerError> {
        let job_id = self.catalog.resolve(slot)?;
        tracing::debug!(%slot, job_id, ?options, "Triggering Rundeck job");
        Ok(self.api.run_job(job_id, options).await?)
    }

    async fn status(&self, execution_id: ExecutionId) -> Result<Execution, RunnerError> {
        Ok(self.api.get_execution(execution_id).await?)
    }
}
