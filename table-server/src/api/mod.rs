//! HTTP API 路由
//!
//! | 模块 | 前缀 | 说明 |
//! |------|------|------|
//! | health | /health | 健康检查 + 在线连接数 |
//! | sessions | /api/sessions | 桌台会话、账单、结账 |
//! | categories | /api/categories | 菜品分类 |
//! | products | /api/products | 菜品目录 |
//! | ws | /ws | 实时通道 (admin / client) |
//!
//! Admin routes are expected to sit behind an external auth layer.

pub mod categories;
pub mod health;
pub mod products;
pub mod sessions;
pub mod ws;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;
use crate::orders::{OrderCoordinator, OrderResult};
use crate::utils::AppResult;

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        .merge(health::router())
        .merge(sessions::router())
        .merge(categories::router())
        .merge(products::router())
        .merge(ws::router())
}

/// Build the application with middleware; state is applied by the caller
pub fn build_app() -> Router<ServerState> {
    build_router().layer(
        ServiceBuilder::new()
            // Trace - Request tracing (logs at INFO level)
            .layer(TraceLayer::new_for_http())
            // CORS - Handle cross-origin requests
            .layer(CorsLayer::permissive()),
    )
}

/// Run a coordinator call on the blocking pool
pub(crate) async fn blocking<T, F>(state: &ServerState, f: F) -> AppResult<T>
where
    F: FnOnce(&OrderCoordinator) -> OrderResult<T> + Send + 'static,
    T: Send + 'static,
{
    let coordinator = state.coordinator.clone();
    Ok(tokio::task::spawn_blocking(move || f(&coordinator)).await??)
}
