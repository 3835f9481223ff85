use std::time::Duration;

use autodeploy_pipeline::DeploymentEvent;
use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{Sink, SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::extract::ApiQuery;
use crate::state::AppState;

/// Interval between heartbeat pings (in seconds).
const HEARTBEAT_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    /// Only forward events for this deployment.
    pub deployment: Option<Uuid>,
}

/// HTTP handler that upgrades the connection to WebSocket.
///
/// The event subscription is taken before the upgrade completes, so no
/// event published after the request arrives is missed.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<WsQuery>,
) -> impl IntoResponse {
    let events = state.engine.events().subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, events, query.deployment))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Spawns a sender task that forwards bus events and heartbeat pings.
///   2. Drains inbound frames on the current task until the client leaves.
///   3. Aborts the sender on disconnect.
async fn handle_socket(
    socket: WebSocket,
    events: broadcast::Receiver<DeploymentEvent>,
    filter: Option<Uuid>,
) {
    let conn_id = Uuid::new_v4();
    tracing::info!(%conn_id, deployment = ?filter, "WebSocket connected");

    let (sink, mut stream) = socket.split();

    let send_task = tokio::spawn(forward_events(conn_id, events, filter, sink));

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(%conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    send_task.abort();
    tracing::info!(%conn_id, "WebSocket disconnected");
}

/// Forward matching events (and periodic pings) into `sink` until the
/// bus closes or the sink rejects a frame.
async fn forward_events<S>(
    conn_id: Uuid,
    mut events: broadcast::Receiver<DeploymentEvent>,
    filter: Option<Uuid>,
    mut sink: S,
) where
    S: Sink<Message> + Unpin,
{
    let mut heartbeat = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
    // The first tick completes immediately.
    heartbeat.tick().await;

    loop {
        let msg = tokio::select! {
            _ = heartbeat.tick() => Message::Ping(Bytes::new()),
            received = events.recv() => match received {
                Ok(event) => {
                    if filter.is_some_and(|id| id != event.deployment_id()) {
                        continue;
                    }
                    match serde_json::to_string(&event) {
                        Ok(json) => Message::Text(json.into()),
                        Err(e) => {
                            tracing::error!(%conn_id, error = %e, "Failed to serialize event");
                            continue;
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(%conn_id, skipped, "WebSocket client lagging, events dropped");
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
        };

        if sink.send(msg).await.is_err() {
            tracing::debug!(%conn_id, "WebSocket sink closed");
            break;
        }
    }
}
