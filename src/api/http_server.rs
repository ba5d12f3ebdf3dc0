// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers::{health_handler, info_handler};
use super::recognize::recognize_handler;
use super::result_image::result_image_handler;
use crate::config::ServerConfig;
use crate::storage::ImageStore;
use crate::vision::{LprModelInfo, LprModelManager, PlatePipeline, MAX_IMAGE_SIZE};

/// Request body limit: the largest accepted image plus multipart overhead
pub const MAX_BODY_SIZE: usize = MAX_IMAGE_SIZE + 1024 * 1024;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: PlatePipeline,
    pub store: ImageStore,
    pub models: Arc<Vec<LprModelInfo>>,
    pub enable_error_details: bool,
}

impl AppState {
    pub fn new(manager: &LprModelManager, store: ImageStore, enable_error_details: bool) -> Self {
        Self {
            pipeline: manager.pipeline(),
            store,
            models: Arc::new(manager.list_models()),
            enable_error_details,
        }
    }

    /// State around an arbitrary pipeline, with no model metadata
    pub fn with_pipeline(pipeline: PlatePipeline, store: ImageStore) -> Self {
        Self {
            pipeline,
            store,
            models: Arc::new(Vec::new()),
            enable_error_details: false,
        }
    }
}

/// Build the router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_handler))
        // API metadata
        .route("/info", get(info_handler))
        // Plate recognition
        .route("/recognize", post(recognize_handler))
        // Annotated results
        .route("/result_image/:filename", get(result_image_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Load the image store, bind and serve until Ctrl+C
pub async fn start_server(config: &ServerConfig, manager: &LprModelManager) -> anyhow::Result<()> {
    let store = ImageStore::new(&config.upload_dir, &config.output_dir).await?;
    let state = AppState::new(manager, store, config.enable_error_details);
    let app = create_app(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on {}", listener.local_addr()?);
    tracing::info!("Upload folder: {}", config.upload_dir.display());
    tracing::info!("Output folder: {}", config.output_dir.display());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
