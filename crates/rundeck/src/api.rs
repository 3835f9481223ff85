//! REST API client for the Rundeck HTTP endpoints.
//!
//! Wraps job runs, execution lookups, and execution log retrieval using
//! [`reqwest`]. Every request is authenticated with an API token header.

use std::time::Duration;

use autodeploy_core::types::{ExecutionId, JobOptions};
use reqwest::Method;

use crate::models::{Execution, ExecutionOutput};

/// Header Rundeck reads the API token from.
const AUTH_HEADER: &str = "X-Rundeck-Auth-Token";

/// Default API version used in request paths (`/api/46/...`).
pub const DEFAULT_API_VERSION: u32 = 46;

/// Connection settings for a Rundeck server.
#[derive(Debug, Clone)]
pub struct RundeckConfig {
    /// Base URL, e.g. `http://10.0.0.5:4440`.
    pub base_url: String,
    pub token: String,
    pub api_version: u32,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

/// HTTP client for a single Rundeck server.
pub struct RundeckApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
    api_version: u32,
}

/// Errors from the Rundeck REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum RundeckApiError {
    /// The HTTP request itself failed (network, DNS, TLS, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Rundeck returned a non-2xx status code.
    #[error("Rundeck {status}: {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl RundeckApi {
    /// Create a client with its own connection pool and timeout.
    pub fn new(config: RundeckConfig) -> Result<Self, RundeckApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: RundeckConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token,
            api_version: config.api_version,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run a job by UUID with the given option values.
    ///
    /// Sends `POST /job/{id}/run` and returns the new execution, which is
    /// normally still `running`.
    pub async fn run_job(
        &self,
        job_id: &str,
        options: &JobOptions,
    ) -> Result<Execution, RundeckApiError> {
        let body = serde_json::json!({ "options": options });

        let response = self
            .request(Method::POST, &format!("/job/{job_id}/run"))
            .json(&body)
            .send()
            .await?;

        let execution: Execution = Self::parse_response(response).await?;
        tracing::info!(
            job_id,
            execution_id = execution.id,
            status = %execution.status,
            "Rundeck job started",
        );
        Ok(execution)
    }

    /// Fetch the current state of an execution.
    pub async fn get_execution(
        &self,
        execution_id: ExecutionId,
    ) -> Result<Execution, RundeckApiError> {
        let response = self
            .request(Method::GET, &format!("/execution/{execution_id}"))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch execution log output starting at byte `offset`.
    pub async fn get_execution_output(
        &self,
        execution_id: ExecutionId,
        offset: u64,
    ) -> Result<ExecutionOutput, RundeckApiError> {
        let response = self
            .request(Method::GET, &format!("/execution/{execution_id}/output"))
            .query(&[("offset", offset.to_string()), ("format", "json".to_string())])
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch server information. Used as a reachability check.
    pub async fn system_info(&self) -> Result<serde_json::Value, RundeckApiError> {
        let response = self.request(Method::GET, "/system/info").send().await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Start a request against `/api/{version}{path}` with auth headers set.
    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/api/{}{}", self.base_url, self.api_version, path);
        self.client
            .request(method, url)
            .header(AUTH_HEADER, &self.token)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`RundeckApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, RundeckApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(RundeckApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, RundeckApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}
