//! Overlay server — Axum HTTP surface polled by browser-source widgets.
//!
//! Serves the current view model and per-widget readouts as JSON.
//! CORS is open so widgets can be hosted on any origin.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    routing::get,
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use routes::AppState;

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/overlays", get(routes::get_overlays))
        .route("/api/view", get(routes::get_view))
        .route("/api/overlay/:kind", get(routes::get_overlay))
        .route("/health", get(routes::health))
        .layer(cors)
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(state: AppState, port: u16, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind overlay server port {port}"))?;

    info!(port, "Overlay server listening on http://localhost:{port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Overlay server error")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
