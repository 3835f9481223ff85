//! Domain building blocks for the AutoDeploy console.
//!
//! Nothing in this crate talks to the network: it holds the error type,
//! the catalogue of Rundeck job slots, request validation, and the
//! deployment plans the queue engine executes.

pub mod cluster;
pub mod error;
pub mod job_slot;
pub mod plan;
pub mod types;
pub mod vm_name;
