#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use autodeploy_api::config::ServerConfig;
use autodeploy_api::router::build_app_router;
use autodeploy_api::state::AppState;
use autodeploy_core::types::JobOptions;
use autodeploy_pipeline::{PipelineEngine, RundeckRunner};
use autodeploy_rundeck::RundeckApi;
use axum::body::Body;
use axum::extract::{Path as UrlPath, Query, State};
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get as route_get, post};
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Job UUID the mock answers with a 500.
pub const BROKEN_JOB: &str = "broken-job";

/// Execution id the mock reports as unknown.
pub const MISSING_EXECUTION: i64 = 404;

/// A job run the mock Rundeck received.
#[derive(Debug, Clone)]
pub struct RecordedRun {
    pub job_id: String,
    pub options: JobOptions,
}

#[derive(Default)]
struct MockState {
    next_id: AtomicI64,
    runs: Mutex<Vec<RecordedRun>>,
}

/// In-process stand-in for a Rundeck server.
///
/// Every run succeeds on the first status poll.
pub struct MockRundeck {
    pub url: String,
    state: Arc<MockState>,
}

impl MockRundeck {
    pub fn runs(&self) -> Vec<RecordedRun> {
        self.state.runs.lock().unwrap().clone()
    }
}

/// Start the mock on an ephemeral local port.
pub async fn spawn_mock_rundeck() -> MockRundeck {
    let state = Arc::new(MockState {
        next_id: AtomicI64::new(100),
        ..Default::default()
    });

    let router = Router::new()
        .route("/api/46/system/info", route_get(system_info))
        .route("/api/46/job/{id}/run", post(run_job))
        .route("/api/46/execution/{id}", route_get(execution))
        .route("/api/46/execution/{id}/output", route_get(output))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    MockRundeck {
        url: format!("http://{addr}"),
        state,
    }
}

async fn system_info() -> Json<Value> {
    Json(json!({ "system": { "rundeck": { "version": "5.8.0" } } }))
}

#[derive(Deserialize)]
struct RunBody {
    options: JobOptions,
}

async fn run_job(
    State(state): State<Arc<MockState>>,
    UrlPath(job_id): UrlPath<String>,
    Json(body): Json<RunBody>,
) -> Response {
    if job_id == BROKEN_JOB {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }

    let id = state.next_id.fetch_add(1, Ordering::SeqCst);
    state.runs.lock().unwrap().push(RecordedRun {
        job_id: job_id.clone(),
        options: body.options,
    });

    Json(json!({
        "id": id,
        "href": format!("http://rundeck/api/46/execution/{id}"),
        "status": "running",
        "job": { "id": job_id, "name": "Mock job" },
    }))
    .into_response()
}

async fn execution(UrlPath(id): UrlPath<i64>) -> Response {
    if id == MISSING_EXECUTION {
        return (
            StatusCode::NOT_FOUND,
            format!("Execution ID does not exist: {id}"),
        )
            .into_response();
    }

    Json(json!({
        "id": id,
        "status": "succeeded",
        "date-started": { "unixtime": 1_760_000_000_000_i64, "date": "2025-10-09T08:53:20Z" },
        "date-ended": { "unixtime": 1_760_000_060_000_i64, "date": "2025-10-09T08:54:20Z" },
        "job": { "id": "job-uuid-1", "name": "Provision VM" },
    }))
    .into_response()
}

async fn output(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let offset = query.get("offset").map(String::as_str).unwrap_or("0");
    if offset == "0" {
        Json(json!({
            "offset": "120",
            "completed": false,
            "execCompleted": false,
            "entries": [
                { "time": "08:53:21", "log": "Cloning template", "level": "NORMAL" },
                { "time": "08:53:40", "log": "VM powered on", "level": "NORMAL" },
            ],
        }))
    } else {
        Json(json!({
            "offset": offset,
            "completed": true,
            "execCompleted": true,
            "entries": [],
        }))
    }
}

/// Configuration pointing at `rundeck_url` with every job slot bound to
/// `job-uuid-N`. `overrides` replace or add env entries.
pub fn test_config(rundeck_url: &str, overrides: &[(&str, &str)]) -> ServerConfig {
    let mut env: HashMap<String, String> = HashMap::from([
        ("HOST".into(), "127.0.0.1".into()),
        ("PORT".into(), "0".into()),
        ("RUNDECK_URL".into(), rundeck_url.into()),
        ("RUNDECK_TOKEN".into(), "test-token".into()),
        ("REQUEST_TIMEOUT_SECS".into(), "5".into()),
        ("POLL_INTERVAL_MS".into(), "10".into()),
        ("STEP_TIMEOUT_SECS".into(), "5".into()),
    ]);
    for n in 1..=8 {
        env.insert(format!("JOB{n}_ID"), format!("job-uuid-{n}"));
    }
    for (key, value) in overrides {
        if value.is_empty() {
            env.remove(*key);
        } else {
            env.insert(key.to_string(), value.to_string());
        }
    }

    ServerConfig::from_lookup(|key| env.get(key).cloned()).unwrap()
}

/// Same as [`test_config`] but serving the frontend from `dist`.
pub fn test_config_with_frontend(rundeck_url: &str, dist: &Path) -> ServerConfig {
    let dist = dist.to_string_lossy().into_owned();
    test_config(rundeck_url, &[("FRONTEND_DIST", &dist)])
}

/// Build the full application router (same middleware stack as `main.rs`).
///
/// Returns the state too so tests can reach the engine directly.
pub fn build_test_app(config: ServerConfig) -> (Router, AppState) {
    let api = Arc::new(RundeckApi::new(config.rundeck.clone()).unwrap());
    let rundeck = Arc::new(RundeckRunner::new(api, config.jobs.clone()));
    let engine = PipelineEngine::new(rundeck.clone(), config.engine.clone());

    let state = AppState {
        config: Arc::new(config.clone()),
        rundeck,
        engine,
    };
    (build_app_router(state.clone(), &config), state)
}

/// Send a GET request.
pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send a POST request with a JSON body.
pub async fn post_json(app: Router, uri: &str, body: Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send a POST request with a raw body and the given content type.
pub async fn post_raw(app: Router, uri: &str, content_type: &str, body: &str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", content_type)
        .body(Body::from(body.to_owned()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Read a response body as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Read a response body as text.
pub async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Valid cluster form.
pub fn cluster_body() -> Value {
    json!({
        "node1Name": "SQLNODE01",
        "node2Name": "SQLNODE02",
        "clusterName": "SQLCLUSTER01",
        "clusterIp": "10.0.0.50",
        "agName": "AG-SQL01",
        "listenerName": "SQLAG-LSN",
        "listenerIp": "10.0.0.51",
    })
}
