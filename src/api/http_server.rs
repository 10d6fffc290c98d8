// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP server: router, CORS and process-wide state

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::process_image::process_image_handler;
use crate::pipeline::EnhancePipeline;
use crate::version;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// The request-level pipeline, holding the loaded models
    pub pipeline: Arc<EnhancePipeline>,
}

/// Build the application router. Split out from [`start_server`] so tests
/// can drive handlers without binding a socket.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_handler))
        // Enhancement pipeline endpoint
        .route("/process-image", post(process_image_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn start_server(port: u16, pipeline: Arc<EnhancePipeline>) -> anyhow::Result<()> {
    let app = build_router(AppState { pipeline });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": version::VERSION_NUMBER,
    }))
}
