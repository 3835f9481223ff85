//! Integration tests for server-side deployments under `/api/deployments`.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use axum::Router;
use common::{body_json, cluster_body, get, post_json, spawn_mock_rundeck, test_config};
use serde_json::{json, Value};

/// Poll `GET /api/deployments/{id}` until it leaves `running`.
async fn wait_until_finished(app: &Router, id: &str) -> Value {
    for _ in 0..200 {
        let response = get(app.clone(), &format!("/api/deployments/{id}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let data = body_json(response).await["data"].clone();
        if data["status"] != "running" {
            return data;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("deployment {id} did not finish");
}

// ---------------------------------------------------------------------------
// Test: VM deployment runs to completion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn vm_deployment_runs_every_step() {
    let mock = spawn_mock_rundeck().await;
    let (app, _) = common::build_test_app(test_config(&mock.url, &[]));

    let response = post_json(
        app.clone(),
        "/api/deployments/vm",
        json!({ "vmName": "SQL01", "joinDomain": true, "installSql": true }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let data = body_json(response).await["data"].clone();
    assert_eq!(data["kind"], "vm");
    assert_eq!(data["target"], "sql01");
    let keys: Vec<_> = data["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["key"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(keys, ["provision", "domain-join", "sql-install", "sql-config"]);

    let id = data["id"].as_str().unwrap().to_string();
    let finished = wait_until_finished(&app, &id).await;
    assert_eq!(finished["status"], "succeeded");
    assert!(finished["finishedAt"].is_string());
    for step in finished["steps"].as_array().unwrap() {
        assert_eq!(step["status"], "succeeded");
        assert!(step["executionId"].is_number());
    }

    let jobs: Vec<_> = mock.runs().into_iter().map(|r| r.job_id).collect();
    assert_eq!(jobs, ["job-uuid-1", "job-uuid-2", "job-uuid-3", "job-uuid-4"]);
}

#[tokio::test]
async fn vm_deployment_rejects_sql_without_domain() {
    let mock = spawn_mock_rundeck().await;
    let (app, _) = common::build_test_app(test_config(&mock.url, &[]));

    let response = post_json(
        app,
        "/api/deployments/vm",
        json!({ "vmName": "sql01", "joinDomain": false, "installSql": true }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "installSql requires joinDomain");
}

// ---------------------------------------------------------------------------
// Test: cluster deployment
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cluster_deployment_finishes_with_setup_last() {
    let mock = spawn_mock_rundeck().await;
    let (app, _) = common::build_test_app(test_config(&mock.url, &[]));

    let response = post_json(app.clone(), "/api/deployments/cluster", cluster_body()).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let data = body_json(response).await["data"].clone();
    assert_eq!(data["kind"], "cluster");
    assert_eq!(data["steps"].as_array().unwrap().len(), 7);

    let id = data["id"].as_str().unwrap().to_string();
    let finished = wait_until_finished(&app, &id).await;
    assert_eq!(finished["status"], "succeeded");

    let runs = mock.runs();
    assert_eq!(runs.len(), 7);
    assert_eq!(runs.last().unwrap().job_id, "job-uuid-7");
    assert_eq!(runs.last().unwrap().options["ag_name"], "AG-SQL01");
}

#[tokio::test]
async fn cluster_deployment_needs_every_job_configured() {
    let mock = spawn_mock_rundeck().await;
    let (app, _) = common::build_test_app(test_config(&mock.url, &[("JOB8_ID", "")]));

    let response = post_json(app, "/api/deployments/cluster", cluster_body()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    assert!(mock.runs().is_empty());
}

// ---------------------------------------------------------------------------
// Test: failed trigger fails the deployment and skips the rest
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_step_skips_downstream_steps() {
    let mock = spawn_mock_rundeck().await;
    let (app, _) = common::build_test_app(test_config(&mock.url, &[("JOB2_ID", common::BROKEN_JOB)]));

    let response = post_json(
        app.clone(),
        "/api/deployments/vm",
        json!({ "vmName": "web01", "joinDomain": true, "installSql": true }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let id = body_json(response).await["data"]["id"].as_str().unwrap().to_string();

    let finished = wait_until_finished(&app, &id).await;
    assert_eq!(finished["status"], "failed");

    let statuses: Vec<_> = finished["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["status"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(statuses, ["succeeded", "failed", "skipped", "skipped"]);
    assert!(finished["steps"][1]["error"]
        .as_str()
        .unwrap()
        .contains("Rundeck 500"));
}

// ---------------------------------------------------------------------------
// Test: listing and lookup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_returns_started_deployments() {
    let mock = spawn_mock_rundeck().await;
    let (app, _) = common::build_test_app(test_config(&mock.url, &[]));

    let response = get(app.clone(), "/api/deployments").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["data"].as_array().unwrap().is_empty());

    post_json(app.clone(), "/api/deployments/vm", json!({ "vmName": "a01" })).await;
    post_json(app.clone(), "/api/deployments/vm", json!({ "vmName": "b01" })).await;

    let response = get(app, "/api/deployments").await;
    let data = body_json(response).await["data"].clone();
    assert_eq!(data.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_deployment_returns_404() {
    let mock = spawn_mock_rundeck().await;
    let (app, _) = common::build_test_app(test_config(&mock.url, &[]));

    let response = get(app.clone(), "/api/deployments/00000000-0000-4000-8000-000000000000").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");

    let response = get(app, "/api/deployments/not-a-uuid").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

// ---------------------------------------------------------------------------
// Test: no new deployments after shutdown
// ---------------------------------------------------------------------------

#[tokio::test]
async fn start_after_shutdown_is_a_conflict() {
    let mock = spawn_mock_rundeck().await;
    let (app, state) = common::build_test_app(test_config(&mock.url, &[]));

    state.engine.shutdown().await;

    let response = post_json(app, "/api/deployments/vm", json!({ "vmName": "web01" })).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"], "Server is shutting down");
}
