use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    /// Live realtime connections across all rooms.
    connections: usize,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, connections) = match state.hub.connection_count().await {
        Ok(n) => ("ok", n),
        Err(_) => ("degraded", 0),
    };
    Json(HealthResponse {
        status: status.to_string(),
        connections,
    })
}
