use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use autodeploy_core::job_slot::JobSlot;
use autodeploy_pipeline::EngineConfig;
use autodeploy_rundeck::api::DEFAULT_API_VERSION;
use autodeploy_rundeck::{JobCatalog, RundeckConfig};

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} must be a valid {expected}, got '{value}'")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Server configuration loaded from environment variables.
///
/// Everything except the Rundeck token has a default suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: IpAddr,
    /// Bind port (default: `3001`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Directory holding the built frontend (default: `frontend/dist`).
    pub frontend_dist: PathBuf,
    /// Emit logs as JSON lines instead of human-readable text.
    pub log_json: bool,
    pub rundeck: RundeckConfig,
    /// Rundeck job UUID for each job slot.
    pub jobs: JobCatalog,
    pub engine: EngineConfig,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3001`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `FRONTEND_DIST`        | `frontend/dist`            |
    /// | `LOG_FORMAT`           | `text` (or `json`)         |
    /// | `RUNDECK_URL`          | `http://10.0.0.5:4440`     |
    /// | `RUNDECK_TOKEN`        | required                   |
    /// | `RUNDECK_API_VERSION`  | `46`                       |
    /// | `JOB1_ID` .. `JOB8_ID` | unset                      |
    /// | `POLL_INTERVAL_MS`     | `3000`                     |
    /// | `STEP_TIMEOUT_SECS`    | `7200`                     |
    /// | `MAX_POLL_ERRORS`      | `10`                       |
    /// | `MAX_RETAINED_DEPLOYMENTS` | `50`                   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host: IpAddr = parse(&lookup, "HOST", "0.0.0.0", "IP address")?;
        let port: u16 = parse(&lookup, "PORT", "3001", "u16")?;

        let cors_origins: Vec<String> = get("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = parse(&lookup, "REQUEST_TIMEOUT_SECS", "30", "u64")?;
        let frontend_dist = PathBuf::from(get("FRONTEND_DIST", "frontend/dist"));
        let log_json = get("LOG_FORMAT", "text").eq_ignore_ascii_case("json");

        let token = lookup("RUNDECK_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::Missing("RUNDECK_TOKEN"))?;
        let rundeck = RundeckConfig {
            base_url: get("RUNDECK_URL", "http://10.0.0.5:4440"),
            token,
            api_version: parse(
                &lookup,
                "RUNDECK_API_VERSION",
                &DEFAULT_API_VERSION.to_string(),
                "u32",
            )?,
            request_timeout: Duration::from_secs(request_timeout_secs),
        };

        let jobs = JobCatalog::from_lookup(|slot: JobSlot| lookup(&format!("JOB{}_ID", slot.number())));

        let engine = EngineConfig {
            poll_interval: Duration::from_millis(parse(&lookup, "POLL_INTERVAL_MS", "3000", "u64")?),
            step_timeout: Duration::from_secs(parse(&lookup, "STEP_TIMEOUT_SECS", "7200", "u64")?),
            max_poll_errors: parse(&lookup, "MAX_POLL_ERRORS", "10", "u32")?,
            max_retained: parse(&lookup, "MAX_RETAINED_DEPLOYMENTS", "50", "usize")?,
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            frontend_dist,
            log_json,
            rundeck,
            jobs,
            engine,
        })
    }
}

/// Parse `key` from `lookup`, falling back to `default` when unset.
fn parse<T, F>(lookup: &F, key: &'static str, default: &str, expected: &'static str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key).unwrap_or_else(|| default.to_string());
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        expected,
        value,
    })
}
