//! Binding of job slots to Rundeck job UUIDs.

use std::collections::HashMap;

use autodeploy_core::error::CoreError;
use autodeploy_core::job_slot::JobSlot;

#[derive(Debug, Clone, Default)]
pub struct JobCatalog {
    jobs: HashMap<JobSlot, String>,
}

impl JobCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog by looking up each slot's UUID through `lookup`
    /// (e.g. an environment reader). Slots with no value, or a blank one,
    /// are left unbound.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(JobSlot) -> Option<String>,
    {
        let jobs = JobSlot::ALL
            .into_iter()
            .filter_map(|slot| {
                lookup(slot)
                    .map(|id| id.trim().to_string())
                    .filter(|id| !id.is_empty())
                    .map(|id| (slot, id))
            })
            .collect();
        Self { jobs }
    }

    pub fn with_job(mut self, slot: JobSlot, job_id: impl Into<String>) -> Self {
        self.jobs.insert(slot, job_id.into());
        self
    }

    /// Rundeck job UUID for `slot`.
    pub fn resolve(&self, slot: JobSlot) -> Result<&str, CoreError> {
        self.jobs
            .get(&slot)
            .map(String::as_str)
            .ok_or_else(|| CoreError::Validation(format!("job {} is not configured", slot.number())))
    }

    /// Slots that have a job bound, in slot order.
    pub fn configured(&self) -> Vec<JobSlot> {
        let mut slots: Vec<_> = self.jobs.keys().copied().collect();
        slots.sort();
        slots
    }
}
