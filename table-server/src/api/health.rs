//! 健康检查路由
//!
//! ```json
//! { "status": "ok", "version": "0.1.0", "connections": { "admins": 1, "clients": 3 } }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;
use crate::hub::HubStats;

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// ok | degraded
    status: &'static str,
    version: &'static str,
    /// Absent when the Hub is not running
    #[serde(skip_serializing_if = "Option::is_none")]
    connections: Option<HubStats>,
}

async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let connections = state.hub.stats().await;
    Json(HealthResponse {
        status: if connections.is_some() { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        connections,
    })
}
