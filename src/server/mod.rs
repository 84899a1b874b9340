// ============================================================
// Layer 1 — HTTP Server
// ============================================================
// axum front end over PredictionService.
//
//   GET  /              → liveness message
//   GET  /health/ready  → which model version is being served
//   POST /predict       → one record in, one grade out
//
// Startup order is what makes readiness meaningful: the artifact
// is loaded first (see cli::run_serve), and only then is the
// listener bound. A failed load exits before anything listens.
//
// Each prediction runs on the blocking pool under a timeout, so a
// slow model cannot stall the async workers.

mod error;
mod routes;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::application::prediction_service::PredictionService;

/// Where and how to listen.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host:              String,
    pub port:              u16,
    pub inference_timeout: Duration,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service:           Arc<PredictionService>,
    pub inference_timeout: Duration,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/health/ready", get(routes::ready))
        .route("/predict", post(routes::predict))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C or SIGTERM.
pub async fn serve(config: ServerConfig, service: PredictionService) -> Result<()> {
    let state = AppState {
        service:           Arc::new(service),
        inference_timeout: config.inference_timeout,
    };
    let version = state.service.version().clone();

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Cannot bind {}:{}", config.host, config.port))?;

    tracing::info!(
        "Serving '{}' version {} ({}) on {}",
        version.name,
        version.version,
        version.stage,
        listener.local_addr()?,
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Cannot listen for Ctrl-C: {}", e);
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
                tracing::warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c    => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received, draining connections");
}
