//! Connection session - 单连接读循环
//!
//! One [`ConnectionSession`] per live connection. It registers with the Hub,
//! reads frames until the peer goes away or the connection token is
//! cancelled, and always unregisters on the way out.
//!
//! The loop is transport-agnostic: it consumes any stream of
//! [`InboundFrame`]s and writes replies into the connection's
//! [`OutboundQueue`]. See [`ws`] for the axum WebSocket binding.

pub mod ws;

use std::fmt::Display;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::hub::{ConnectionId, ConnectionSink, DeliveryError, HubHandle, OutboundQueue};
use crate::message::{Caller, Dispatcher, Role};

/// Transport frame, reduced to what the loop cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Text(String),
    Binary(Vec<u8>),
    Ping,
    Pong,
    Close,
}

/// Keeps the Hub membership alive for the lifetime of the loop
///
/// Dropping it unregisters and cancels the connection token. Runs on normal
/// exit, on error and when the loop future itself is dropped.
struct Registration {
    hub: HubHandle,
    caller: Caller,
    token: CancellationToken,
}

impl Registration {
    fn register(
        hub: HubHandle,
        caller: Caller,
        sink: Arc<dyn ConnectionSink>,
        token: CancellationToken,
    ) -> Self {
        match caller.role {
            Role::Admin => hub.register_admin(caller.connection_id, sink),
            Role::Client { session_id } => {
                hub.register_client(caller.connection_id, session_id, sink)
            }
        }
        Self { hub, caller, token }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        match self.caller.role {
            Role::Admin => self.hub.unregister_admin(self.caller.connection_id),
            Role::Client { .. } => self.hub.unregister_client(self.caller.connection_id),
        }
        self.token.cancel();
        tracing::debug!(
            connection_id = %self.caller.connection_id,
            role = %self.caller.role,
            "Connection unregistered"
        );
    }
}

pub struct ConnectionSession {
    caller: Caller,
    dispatcher: Dispatcher,
    outbound: OutboundQueue,
    token: CancellationToken,
}

impl ConnectionSession {
    /// `role` must already be authorized; client sessions are validated at handshake
    pub fn new(
        role: Role,
        dispatcher: Dispatcher,
        outbound: OutboundQueue,
        token: CancellationToken,
    ) -> Self {
        Self {
            caller: Caller {
                connection_id: Uuid::new_v4(),
                role,
            },
            dispatcher,
            outbound,
            token,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.caller.connection_id
    }

    /// Read loop; returns once the connection is finished and unregistered
    pub async fn run<S, E>(self, mut inbound: S)
    where
        S: Stream<Item = Result<InboundFrame, E>> + Unpin,
        E: Display,
    {
        let connection_id = self.caller.connection_id;
        let _registration = Registration::register(
            self.dispatcher.hub().clone(),
            self.caller,
            Arc::new(self.outbound.clone()),
            self.token.clone(),
        );
        tracing::info!(
            connection_id = %connection_id,
            role = %self.caller.role,
            session_id = ?self.caller.role.session_id(),
            "Connection established"
        );

        loop {
            tokio::select! {
                _ = self.token.cancelled() => {
                    tracing::debug!(connection_id = %connection_id, "Connection cancelled");
                    break;
                }
                frame = inbound.next() => {
                    match frame {
                        Some(Ok(InboundFrame::Text(text))) => {
                            let reply = self.dispatcher.dispatch(self.caller, &text).await;
                            self.reply(reply);
                        }
                        Some(Ok(InboundFrame::Binary(_))) => {
                            let reply = self.dispatcher.unsupported_frame(connection_id);
                            self.reply(reply);
                        }
                        Some(Ok(InboundFrame::Ping | InboundFrame::Pong)) => {}
                        Some(Ok(InboundFrame::Close)) | None => {
                            tracing::debug!(connection_id = %connection_id, "Peer closed connection");
                            break;
                        }
                        Some(Err(e)) => {
                            tracing::warn!(connection_id = %connection_id, error = %e, "Read error");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!(connection_id = %connection_id, "Connection finished");
    }

    /// Direct reply to the requester; skipped once the connection is going away
    fn reply(&self, frame: Arc<str>) {
        if self.token.is_cancelled() {
            tracing::debug!(connection_id = %self.caller.connection_id, "Connection gone, reply skipped");
            return;
        }
        match self.outbound.try_deliver(frame) {
            Ok(()) => {}
            Err(DeliveryError::Full) => {
                tracing::warn!(connection_id = %self.caller.connection_id, "Outbound queue full, reply dropped");
            }
            Err(DeliveryError::Closed) => {
                tracing::debug!(connection_id = %self.caller.connection_id, "Writer closed, reply dropped");
            }
        }
    }
}
