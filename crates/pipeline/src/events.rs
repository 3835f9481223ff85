//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] fans [`DeploymentEvent`]s out to live viewers (the
//! WebSocket endpoint). It is shared via `Arc<EventBus>`.

use autodeploy_core::job_slot::JobSlot;
use autodeploy_core::plan::DeploymentKind;
use autodeploy_core::types::ExecutionId;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::state::{DeploymentStatus, StepStatus};

// ---------------------------------------------------------------------------
// DeploymentEvent
// ---------------------------------------------------------------------------

/// Something that happened while running a deployment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeploymentEvent {
    #[serde(rename_all = "camelCase")]
    DeploymentStarted {
        deployment_id: Uuid,
        kind: DeploymentKind,
        target: String,
        steps: Vec<String>,
    },

    /// A step's job was triggered and has an execution id.
    #[serde(rename_all = "camelCase")]
    StepStarted {
        deployment_id: Uuid,
        step: String,
        slot: JobSlot,
        execution_id: ExecutionId,
    },

    #[serde(rename_all = "camelCase")]
    StepFinished {
        deployment_id: Uuid,
        step: String,
        status: StepStatus,
        execution_id: Option<ExecutionId>,
        error: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    DeploymentFinished {
        deployment_id: Uuid,
        status: DeploymentStatus,
    },
}

impl DeploymentEvent {
    pub fn deployment_id(&self) -> Uuid {
        match self {
            DeploymentEvent::DeploymentStarted { deployment_id, .. }
            | DeploymentEvent::StepStarted { deployment_id, .. }
            | DeploymentEvent::StepFinished { deployment_id, .. }
            | DeploymentEvent::DeploymentFinished { deployment_id, .. } => *deployment_id,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out event bus.
///
/// When the buffer is full the oldest unread events are dropped and slow
/// receivers observe `RecvError::Lagged`.
pub struct EventBus {
    sender: broadcast::Sender<DeploymentEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: DeploymentEvent) {
        // Ignore the SendError: it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DeploymentEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        let id = Uuid::new_v4();

        bus.publish(DeploymentEvent::DeploymentFinished {
            deployment_id: id,
            status: DeploymentStatus::Succeeded,
        });

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(e1, e2);
        assert_eq!(e1.deployment_id(), id);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(DeploymentEvent::DeploymentFinished {
            deployment_id: Uuid::new_v4(),
            status: DeploymentStatus::Failed,
        });
    }

    #[test]
    fn serializes_with_type_tag_and_camel_case_fields() {
        let event = DeploymentEvent::StepStarted {
            deployment_id: Uuid::nil(),
            step: "provision".into(),
            slot: JobSlot::Job1,
            execution_id: 12,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "step_started");
        assert_eq!(json["executionId"], 12);
        assert_eq!(json["slot"], "job1");
        assert_eq!(json["deploymentId"], Uuid::nil().to_string());
    }
}
