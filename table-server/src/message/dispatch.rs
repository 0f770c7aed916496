//! 请求分发
//!
//! Runs a decoded request against the coordinator and decides what the
//! requester and the rest of the table see:
//!
//! - success: `<TYPE>_OK` with the resulting item, returned to the requester
//!   and broadcast (same frame) to the item's session audience;
//! - business or internal failure: `ERROR` frame for the requester only.
//!
//! The coordinator call and the broadcast run together on the blocking pool.
//! Once started, they finish even if the requesting connection goes away.

use std::sync::Arc;

use serde::Serialize;
use shared::message::{Envelope, MessageType};
use shared::models::{OrderSession, OrderedProduct};
use uuid::Uuid;

use super::protocol::{AdminRequest, ClientRequest, ProtocolError, Role};
use crate::hub::{Broadcast, ConnectionId, HubHandle};
use crate::orders::{ErrorKind, OrderCoordinator, OrderError, OrderResult, Privilege};

/// Used only if an error frame itself cannot be serialized
const FALLBACK_ERROR_FRAME: &str =
    r#"{"type":"ERROR","data":{"code":"INTERNAL_ERROR","message":"Internal server error"}}"#;

/// The connection a request came from
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub connection_id: ConnectionId,
    pub role: Role,
}

/// Decoded request of either role
#[derive(Debug, Clone)]
enum Request {
    Client(ClientRequest),
    Admin(AdminRequest),
}

impl Request {
    fn decode(role: Role, text: &str) -> Result<Self, ProtocolError> {
        match role {
            Role::Admin => AdminRequest::decode(text).map(Self::Admin),
            Role::Client { .. } => ClientRequest::decode(text).map(Self::Client),
        }
    }

    fn message_type(&self) -> MessageType {
        match self {
            Self::Client(request) => request.message_type(),
            Self::Admin(request) => request.message_type(),
        }
    }
}

fn encode<T: Serialize>(envelope: &Envelope<T>) -> OrderResult<Arc<str>> {
    Ok(Arc::from(envelope.to_text()?))
}

fn error_frame(code: &str, message: &str) -> Arc<str> {
    Envelope::error(code, message)
        .to_text()
        .map(Arc::from)
        .unwrap_or_else(|_| Arc::from(FALLBACK_ERROR_FRAME))
}

/// Error frame for a protocol violation
pub fn protocol_error_frame(error: &ProtocolError) -> Arc<str> {
    error_frame(error.code(), &error.to_string())
}

/// Error frame for a coordinator failure; internals are logged, never sent
pub fn order_error_frame(error: &OrderError) -> Arc<str> {
    error_frame(error.code(), error.public_message())
}

#[derive(Clone)]
pub struct Dispatcher {
    coordinator: OrderCoordinator,
    hub: HubHandle,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(coordinator: OrderCoordinator, hub: HubHandle) -> Self {
        Self { coordinator, hub }
    }

    pub fn coordinator(&self) -> &OrderCoordinator {
        &self.coordinator
    }

    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    /// Handle one text frame and return the reply for the requester
    pub async fn dispatch(&self, caller: Caller, text: &str) -> Arc<str> {
        let request = match Request::decode(caller.role, text) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(
                    connection_id = %caller.connection_id,
                    role = %caller.role,
                    error = %e,
                    "Rejected inbound frame"
                );
                return protocol_error_frame(&e);
            }
        };

        let message_type = request.message_type();
        let this = self.clone();
        let result = tokio::task::spawn_blocking(move || this.execute(caller, request)).await;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => Err(OrderError::internal(format!("dispatch task failed: {e}"))),
        };

        match outcome {
            Ok(frame) => frame,
            Err(e) => {
                if e.kind() == ErrorKind::Internal {
                    tracing::error!(
                        connection_id = %caller.connection_id,
                        %message_type,
                        error = %e,
                        "Request failed"
                    );
                } else {
                    tracing::debug!(
                        connection_id = %caller.connection_id,
                        %message_type,
                        error = %e,
                        "Request rejected"
                    );
                }
                order_error_frame(&e)
            }
        }
    }

    /// Blocking: coordinator call, then broadcast on success
    fn execute(&self, caller: Caller, request: Request) -> OrderResult<Arc<str>> {
        let message_type = request.message_type();
        let item = match (caller.role, request) {
            (Role::Client { session_id }, Request::Client(ClientRequest::Order(payload))) => {
                self.coordinator.order_product(session_id, payload.product_id)?
            }
            (
                Role::Client { session_id },
                Request::Client(ClientRequest::DeleteOrderedProduct(payload)),
            ) => self.coordinator.delete_ordered_product(
                payload.ordered_product_id,
                Privilege::Client { session_id },
            )?,
            (Role::Admin, Request::Admin(AdminRequest::DeleteOrderedProduct(payload))) => self
                .coordinator
                .delete_ordered_product(payload.ordered_product_id, Privilege::Admin)?,
            (Role::Admin, Request::Admin(AdminRequest::UpdateOrderedProductStatus(payload))) => {
                self.coordinator
                    .update_ordered_product_status(payload.ordered_product_id, payload.status)?
            }
            (role, request) => {
                return Err(OrderError::internal(format!(
                    "request {:?} decoded for mismatched role {role}",
                    request.message_type()
                )));
            }
        };

        let ok = message_type.ok().ok_or_else(|| {
            OrderError::internal(format!("no acknowledgment type for {message_type}"))
        })?;
        let frame = encode(&Envelope::new(ok, &item))?;
        self.publish_item(&item, frame.clone(), caller.connection_id);
        Ok(frame)
    }

    fn publish_item(&self, item: &OrderedProduct, frame: Arc<str>, origin: ConnectionId) {
        self.hub
            .broadcast(Broadcast::to_session(frame, item.session_id).excluding(origin));
    }

    /// `SESSION_UPDATED` to staff and to the session's clients
    pub fn publish_session_update(&self, session: &OrderSession) {
        match encode(&Envelope::new(MessageType::SessionUpdated, session)) {
            Ok(frame) => self.hub.broadcast(Broadcast::to_session(frame, session.id)),
            Err(e) => {
                tracing::error!(session_id = %session.id, error = %e, "Failed to encode session update")
            }
        }
    }

    /// Reply for a frame the transport could not hand over as text
    pub fn unsupported_frame(&self, connection_id: Uuid) -> Arc<str> {
        tracing::debug!(connection_id = %connection_id, "Rejected non-text frame");
        protocol_error_frame(&ProtocolError::UnsupportedFrame)
    }
}
