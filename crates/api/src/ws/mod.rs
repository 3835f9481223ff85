//! WebSocket stream of deployment events.
//!
//! Each connection subscribes to the engine's event bus and receives every
//! [`DeploymentEvent`](autodeploy_pipeline::DeploymentEvent) as a JSON text
//! frame, optionally narrowed to one deployment.

mod handler;

pub use handler::{ws_handler, WsQuery};
