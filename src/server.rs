//! HTTP server setup and configuration.
//!
//! This module provides the router and application state used by both
//! the production server and integration tests.

use axum::{
    extract::State,
    http::{header::CACHE_CONTROL, HeaderValue, Method, Uri},
    response::Response,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::api;
use crate::error::ApiError;
use crate::models::ServerConfig;
use crate::services::{BlobStore, LinkVerifier, LocalBlobStore};

/// Application state shared across all handlers. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<LinkVerifier>,
    pub blob_store: Arc<dyn BlobStore>,
    pub remote: Arc<str>,
}

/// Create application state backed by the local filesystem store.
pub fn create_app_state(config: &ServerConfig) -> AppState {
    let blob_store = Arc::new(LocalBlobStore::new(config.storage_root.clone()));
    create_app_state_with_store(config, blob_store)
}

/// Create application state with a caller-supplied blob store.
pub fn create_app_state_with_store(config: &ServerConfig, blob_store: Arc<dyn BlobStore>) -> AppState {
    AppState {
        verifier: Arc::new(LinkVerifier::from_config(config)),
        blob_store,
        remote: Arc::from(config.remote.as_str()),
    }
}

/// Build the router. Every path goes to the signed file handler.
///
/// Responses are marked `private, no-store` so shared caches never keep a
/// file past its link's expiry.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .fallback(handle_file)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("private, no-store"),
        ))
}

// Wrapper handler to extract state components for the underlying API handler

async fn handle_file(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
) -> Result<Response, ApiError> {
    api::handle_file(
        State(state.verifier),
        State(state.blob_store),
        State(state.remote),
        method,
        uri,
    )
    .await
}

/// Bind `0.0.0.0:<port>` and serve until Ctrl-C.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let remote_dir = config.storage_root.join(&config.remote);
    if !remote_dir.is_dir() {
        anyhow::bail!(
            "remote {:?} not found: {} is not a directory",
            config.remote,
            remote_dir.display()
        );
    }

    let state = create_app_state(&config);
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        addr = %addr,
        host = %config.host,
        remote = %config.remote,
        storage_root = %config.storage_root.display(),
        bind_remote = config.bind_remote,
        "rserve listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(%e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
