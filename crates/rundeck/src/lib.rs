//! Rundeck REST client library.
//!
//! Provides a typed wrapper over the Rundeck job/execution endpoints,
//! the execution and log payload types, and the catalogue that binds the
//! console's job slots to Rundeck job UUIDs.

pub mod api;
pub mod catalog;
pub mod models;

pub use api::{RundeckApi, RundeckApiError, RundeckConfig};
pub use catalog::JobCatalog;
pub use models::{Execution, ExecutionOutput, ExecutionStatus, LogEntry};
