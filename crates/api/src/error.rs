use autodeploy_core::error::CoreError;
use autodeploy_pipeline::RunnerError;
use autodeploy_rundeck::RundeckApiError;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`RundeckApiError`] for
/// upstream failures. Implements [`IntoResponse`] to produce consistent
/// JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `autodeploy_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Rundeck rejected a request or could not be reached.
    #[error(transparent)]
    Rundeck(#[from] RundeckApiError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No route or resource at the requested path.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<RunnerError> for AppError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::Core(e) => AppError::Core(e),
            RunnerError::Api(e) => AppError::Rundeck(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Upstream errors ---
            AppError::Rundeck(err) => classify_rundeck_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a Rundeck error into an HTTP status, error code, and message.
///
/// - A 404 from Rundeck (unknown execution or job) maps to 404.
/// - Any other Rundeck status maps to 502 with the upstream status and body.
/// - Transport failures map to 502 with the transport error text.
fn classify_rundeck_error(err: &RundeckApiError) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %err, "Rundeck request failed");
    match err {
        RundeckApiError::ApiError { status: 404, .. } => {
            (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
        }
        RundeckApiError::ApiError { .. } => {
            (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", err.to_string())
        }
        RundeckApiError::Request(e) => (
            StatusCode::BAD_GATEWAY,
            "UPSTREAM_ERROR",
            format!("Rundeck unreachable: {e}"),
        ),
    }
}
