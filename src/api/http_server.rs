// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use super::detect::{detect_handler, detect_visualize_handler};
use super::handlers::{health_handler, root_handler};
use crate::config::Config;
use crate::vision::{DetectorHandle, Visualizer};

/// Shared, read-only request state
#[derive(Clone)]
pub struct AppState {
    pub detector: DetectorHandle,
    pub visualizer: Arc<Visualizer>,
}

impl AppState {
    pub fn new(detector: DetectorHandle, visualizer: Visualizer) -> Self {
        Self {
            detector,
            visualizer: Arc::new(visualizer),
        }
    }
}

/// Build the router with CORS, body limit and request tracing
pub fn create_app(state: AppState, config: &Config) -> Result<Router> {
    let cors = cors_layer(config)?;

    let app = Router::new()
        .route("/api", get(root_handler))
        .route("/api/", get(root_handler))
        .route("/api/health", get(health_handler))
        .route("/api/detect", post(detect_handler))
        .route("/api/detect/visualize", post(detect_visualize_handler))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

/// Wildcard origins get a credential-less `*` policy; an explicit origin
/// list allows credentials and mirrors the requested methods and headers.
fn cors_layer(config: &Config) -> Result<CorsLayer> {
    if config.allows_any_origin() {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any));
    }

    let origins = config
        .allowed_origins
        .iter()
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .map(|origin| {
            HeaderValue::from_str(origin)
                .with_context(|| format!("Invalid CORS origin: {}", origin))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

/// Bind and serve until Ctrl-C
pub async fn start_server(state: AppState, config: &Config) -> Result<()> {
    let app = create_app(state, config)?;

    let addr = config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("API server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
