use anyhow::Result;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::web::{handlers, AppState};

pub async fn start_web_server(addr: SocketAddr, state: AppState, cancel: CancellationToken) -> Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("⚙️ dashboard running on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;
    Ok(())
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/sequencers", get(handlers::get_all_sequencers))
        .route("/api/sequencers/{name}", get(handlers::get_sequencer))
        .route("/api/logs", get(handlers::get_logs))
        .route("/api/health", get(handlers::get_health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
