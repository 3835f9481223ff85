use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use autodeploy_api::config::ServerConfig;
use autodeploy_api::router::build_app_router;
use autodeploy_api::state::AppState;
use autodeploy_pipeline::{PipelineEngine, RundeckRunner};
use autodeploy_rundeck::RundeckApi;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "autodeploy_api=debug,autodeploy_pipeline=debug,autodeploy_rundeck=debug,tower_http=debug"
            .into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!(
        host = %config.host,
        port = config.port,
        rundeck = %config.rundeck.base_url,
        jobs = ?config.jobs.configured(),
        "Loaded server configuration",
    );

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    // --- Rundeck ---
    let api = Arc::new(RundeckApi::new(config.rundeck.clone())?);
    let rundeck = Arc::new(RundeckRunner::new(api, config.jobs.clone()));

    match rundeck.api().system_info().await {
        Ok(_) => tracing::info!("Rundeck reachable"),
        Err(e) => tracing::warn!(error = %e, "Rundeck not reachable at startup"),
    }

    // --- Pipeline engine ---
    let engine = PipelineEngine::new(rundeck.clone(), config.engine.clone());
    tracing::info!(
        poll_interval_ms = config.engine.poll_interval.as_millis() as u64,
        step_timeout_secs = config.engine.step_timeout.as_secs(),
        "Pipeline engine created",
    );

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        rundeck,
        engine: Arc::clone(&engine),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(config.host, config.port);
    tracing::info!(%addr, frontend = %config.frontend_dist.display(), "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    engine.shutdown().await;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
