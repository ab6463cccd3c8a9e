use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{response::IntoResponse, routing::get, Json, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use morphd_engines::CapabilityRegistry;

use crate::config::Config;
use crate::jobs::{JobRegistry, JobRunner};

mod download;
mod routes_api;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub registry: Arc<JobRegistry>,
    pub runner: Arc<JobRunner>,
    pub capabilities: Arc<CapabilityRegistry>,
    pub config: Arc<Config>,
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", routes_api::api_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health_check(
    axum::extract::State(ctx): axum::extract::State<AppContext>,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "jobs": ctx.registry.list().len(),
    }))
}

/// Bind and serve until ctrl-c.
pub async fn start_server(ctx: AppContext) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", ctx.config.server.host, ctx.config.server.port)
        .parse()
        .context("Invalid server address")?;

    let app = create_router(ctx);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
