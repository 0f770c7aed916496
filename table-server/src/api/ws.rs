//! 实时通道入口
//!
//! - `GET /ws/admin`: staff connection, no handshake (auth sits in front)
//! - `GET /ws/sessions/{session_id}`: table client; the session must exist
//!   and be open, otherwise the upgrade is refused with an HTTP error

use axum::{
    Router,
    extract::{Path, State, ws::WebSocketUpgrade},
    response::Response,
    routing::get,
};

use super::blocking;
use crate::core::ServerState;
use crate::message::Role;
use crate::session::ws::serve_socket;
use crate::utils::AppResult;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/ws/admin", get(admin))
        .route("/ws/sessions/{session_id}", get(client))
}

fn upgrade(state: ServerState, ws: WebSocketUpgrade, role: Role) -> Response {
    let dispatcher = state.dispatcher.clone();
    let config = state.config.socket_config();
    let shutdown = state.shutdown.clone();
    ws.on_upgrade(move |socket| serve_socket(socket, role, dispatcher, config, shutdown))
}

async fn admin(State(state): State<ServerState>, ws: WebSocketUpgrade) -> Response {
    upgrade(state, ws, Role::Admin)
}

async fn client(
    State(state): State<ServerState>,
    Path(session_id): Path<String>,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let session = blocking(&state, move |c| c.validate_session_str(&session_id)).await?;
    tracing::debug!(session_id = %session.id, table_number = session.table_number, "Client handshake accepted");
    Ok(upgrade(state, ws, Role::Client { session_id: session.id }))
}
