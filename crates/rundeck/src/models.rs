//! Payload types returned by the Rundeck execution endpoints.

use std::fmt;

use autodeploy_core::types::ExecutionId;
use serde::{Deserialize, Deserializer, Serialize};

/// Lifecycle status of a Rundeck execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    Running,
    Scheduled,
    Succeeded,
    Failed,
    Aborted,
    TimedOut,
    FailedWithRetry,
    /// Custom status strings set by job steps.
    Other(String),
}

impl ExecutionStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "running" => Self::Running,
            "scheduled" => Self::Scheduled,
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            "aborted" => Self::Aborted,
            "timedout" => Self::TimedOut,
            "failed-with-retry" => Self::FailedWithRetry,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Running => "running",
            Self::Scheduled => "scheduled",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
            Self::TimedOut => "timedout",
            Self::FailedWithRetry => "failed-with-retry",
            Self::Other(s) => s,
        }
    }

    /// Whether Rundeck will not change this status any more.
    ///
    /// `failed-with-retry` is not terminal: Rundeck starts a retry
    /// execution of its own.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::Aborted | Self::TimedOut
        )
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ExecutionStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ExecutionStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// Timestamp pair Rundeck attaches to executions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DateInfo {
    /// Milliseconds since the Unix epoch.
    pub unixtime: i64,
    /// ISO-8601 rendering.
    pub date: String,
}

/// Job summary embedded in an execution.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
}

/// An execution of a Rundeck job (`/job/{id}/run`, `/execution/{id}`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Execution {
    pub id: ExecutionId,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub job: Option<JobRef>,
    #[serde(rename = "date-started", default)]
    pub date_started: Option<DateInfo>,
    #[serde(rename = "date-ended", default)]
    pub date_ended: Option<DateInfo>,
}

/// One line of execution log output.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogEntry {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub log: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub node: Option<String>,
}

/// A chunk of execution log output (`/execution/{id}/output`).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutput {
    /// Whether the whole log has been returned.
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub exec_completed: bool,
    #[serde(default)]
    pub exec_state: Option<String>,
    /// Byte offset to pass on the next request.
    #[serde(default, deserialize_with = "offset_from_string_or_number")]
    pub offset: u64,
    #[serde(default)]
    pub entries: Vec<LogEntry>,
}

/// Rundeck reports the log offset as a string on some versions and as a
/// number on others.
fn offset_from_string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Offset {
        Number(u64),
        Text(String),
    }

    match Offset::deserialize(deserializer)? {
        Offset::Number(n) => Ok(n),
        Offset::Text(s) if s.is_empty() => Ok(0),
        Offset::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}
