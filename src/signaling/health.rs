//! Plain HTTP liveness report on a side listener.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tracing::info;

use super::actor::RoomManagerHandle;

pub const DEFAULT_HEALTH_PORT: u16 = 3002;

/// GET /health: registry occupancy, or 503 once the room manager is gone.
async fn health(State(handle): State<RoomManagerHandle>) -> (StatusCode, Json<Value>) {
    match handle.stats().await {
        Ok(stats) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "rooms": stats.rooms,
                "participants": stats.participants,
                "connections": stats.connections,
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unavailable",
                "error": e.to_string(),
            })),
        ),
    }
}

pub fn health_router(handle: RoomManagerHandle) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(handle)
}

/// Serve the health route until the listener fails
pub async fn serve_health(listener: TcpListener, handle: RoomManagerHandle) -> std::io::Result<()> {
    info!("Health endpoint listening on {}", listener.local_addr()?);
    axum::serve(listener, health_router(handle)).await
}
