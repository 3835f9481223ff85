//! Deployment queue engine.
//!
//! Runs a [`DeploymentPlan`](autodeploy_core::plan::DeploymentPlan) against
//! Rundeck: ready steps are triggered as soon as their dependencies
//! succeed (so independent steps run side by side), each running step is
//! polled until its execution ends, and the first failure stops the rest
//! of the plan.
//!
//! - [`JobRunner`]: the seam between the engine and Rundeck.
//! - [`PipelineEngine`]: spawns and drives deployments.
//! - [`DeploymentRegistry`]: in-memory snapshots of recent deployments.
//! - [`EventBus`]: broadcast of [`DeploymentEvent`]s for live views.

pub mod engine;
pub mod events;
pub mod registry;
pub mod runner;
pub mod state;

pub use engine::{EngineConfig, PipelineEngine};
pub use events::{DeploymentEvent, EventBus};
pub use registry::DeploymentRegistry;
pub use runner::{JobRunner, RundeckRunner, RunnerError};
pub use state::{DeploymentSnapshot, DeploymentStatus, StepSnapshot, StepStatus};
