use crate::config::RelayConfig;
use crate::signaling::{SignalingService, ws_handler};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub fn router(service: SignalingService) -> Router {
    // Browser clients are served from another origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn health(State(service): State<SignalingService>) -> Result<Json<Value>, StatusCode> {
    let snapshot = service
        .snapshot()
        .await
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)?;

    Ok(Json(json!({
        "status": "ok",
        "rooms": snapshot.rooms,
        "endpoints": snapshot.endpoints,
        "connections": service.peer_count(),
    })))
}

/// Runs the relay and its HTTP/WebSocket front until the listener fails.
pub async fn serve(config: RelayConfig) -> Result<()> {
    let service = SignalingService::start(&config);
    let app = router(service);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    info!("Signaling relay listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
