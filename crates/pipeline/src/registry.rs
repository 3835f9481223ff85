//! In-memory store of deployment snapshots.
//!
//! Nothing survives a restart. Running deployments are always kept;
//! finished ones are evicted oldest-first once more than `max_retained`
//! have accumulated.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::state::{DeploymentSnapshot, DeploymentStatus, StepSnapshot};

/// Default number of finished deployments kept for inspection.
pub const DEFAULT_MAX_RETAINED: usize = 50;

pub struct DeploymentRegistry {
    deployments: RwLock<HashMap<Uuid, DeploymentSnapshot>>,
    max_retained: usize,
}

impl DeploymentRegistry {
    pub fn new(max_retained: usize) -> Self {
        Self {
            deployments: RwLock::new(HashMap::new()),
            max_retained,
        }
    }

    pub async fn insert(&self, snapshot: DeploymentSnapshot) {
        self.deployments.write().await.insert(snapshot.id, snapshot);
    }

    pub async fn get(&self, id: Uuid) -> Option<DeploymentSnapshot> {
        self.deployments.read().await.get(&id).cloned()
    }

    /// All deployments, newest first.
    pub async fn list(&self) -> Vec<DeploymentSnapshot> {
        let mut all: Vec<_> = self.deployments.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    /// Apply `update` to step `index` of deployment `id`.
    ///
    /// Returns the updated step, or `None` if either does not exist.
    pub async fn update_step<F>(&self, id: Uuid, index: usize, update: F) -> Option<StepSnapshot>
    where
        F: FnOnce(&mut StepSnapshot),
    {
        let mut deployments = self.deployments.write().await;
        let step = deployments.get_mut(&id)?.steps.get_mut(index)?;
        update(step);
        Some(step.clone())
    }

    /// Record the final status of a deployment and evict old entries.
    pub async fn finish(&self, id: Uuid, status: DeploymentStatus) {
        let mut deployments = self.deployments.write().await;
        if let Some(deployment) = deployments.get_mut(&id) {
            deployment.status = status;
            deployment.finished_at = Some(Utc::now());
        }
        Self::evict(&mut deployments, self.max_retained);
    }

    fn evict(deployments: &mut HashMap<Uuid, DeploymentSnapshot>, max_retained: usize) {
        let mut finished: Vec<_> = deployments
            .values()
            .filter(|d| d.is_finished())
            .map(|d| (d.finished_at, d.id))
            .collect();
        if finished.len() <= max_retained {
            return;
        }

        finished.sort();
        let excess = finished.len() - max_retained;
        for (_, id) in finished.into_iter().take(excess) {
            deployments.remove(&id);
            tracing::debug!(deployment_id = %id, "Evicted finished deployment");
        }
    }
}

impl Default for DeploymentRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETAINED)
    }
}
