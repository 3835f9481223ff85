//! Handlers for the `/jobs` resource: status and log output of a single
//! Rundeck execution, polled by the console while a job runs.

use autodeploy_core::types::ExecutionId;
use autodeploy_rundeck::{Execution, LogEntry};
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::extract::{ApiPath, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionView {
    pub id: ExecutionId,
    pub status: String,
    /// ISO-8601 start time.
    pub date_started: Option<String>,
    /// ISO-8601 end time; `None` while the execution runs.
    pub date_ended: Option<String>,
    /// Job name.
    pub job: Option<String>,
}

impl From<Execution> for ExecutionView {
    fn from(exec: Execution) -> Self {
        Self {
            id: exec.id,
            status: exec.status.to_string(),
            date_started: exec.date_started.map(|d| d.date),
            date_ended: exec.date_ended.map(|d| d.date),
            job: exec.job.map(|j| j.name),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    #[serde(default)]
    pub offset: u64,
}

#[derive(Debug, Serialize)]
pub struct LogLine {
    pub time: String,
    pub log: String,
    pub level: String,
}

#[derive(Debug, Serialize)]
pub struct LogChunk {
    pub completed: bool,
    /// Offset to request next.
    pub offset: u64,
    pub entries: Vec<LogLine>,
}

impl From<LogEntry> for LogLine {
    fn from(entry: LogEntry) -> Self {
        Self {
            time: entry.time,
            log: entry.log,
            level: entry.level,
        }
    }
}

/// GET /api/jobs/{execution_id}
pub async fn get_execution(
    State(state): State<AppState>,
    ApiPath(execution_id): ApiPath<ExecutionId>,
) -> AppResult<Json<ExecutionView>> {
    let exec = state.rundeck.api().get_execution(execution_id).await?;
    Ok(Json(exec.into()))
}

/// GET /api/jobs/{execution_id}/log?offset=N
///
/// Returns log lines from `offset` on. Callers pass the returned offset
/// back to fetch only new output.
pub async fn get_execution_log(
    State(state): State<AppState>,
    ApiPath(execution_id): ApiPath<ExecutionId>,
    ApiQuery(query): ApiQuery<LogQuery>,
) -> AppResult<Json<LogChunk>> {
    let output = state
        .rundeck
        .api()
        .get_execution_output(execution_id, query.offset)
        .await?;

    tracing::debug!(
        execution_id,
        offset = output.offset,
        entries = output.entries.len(),
        "Fetched execution log",
    );

    Ok(Json(LogChunk {
        completed: output.completed,
        offset: output.offset,
        entries: output.entries.into_iter().map(LogLine::from).collect(),
    }))
}
