//! 入站帧解码
//!
//! Text frame → [`RawEnvelope`] → [`MessageType`] → role-specific request.
//! Each role has its own closed request type, so a type the role may not send
//! is rejected here and never reaches the coordinator.

use serde::de::DeserializeOwned;
use shared::message::{
    DeleteOrderedProductPayload, Envelope, ErrorPayload, MessageType, OrderPayload, RawEnvelope,
    UnknownMessageType, UpdateOrderedProductStatusPayload,
};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Which side of the table a connection belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Client { session_id: Uuid },
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Client { .. } => "client",
        }
    }

    /// Session the connection is bound to (clients only)
    pub fn session_id(&self) -> Option<Uuid> {
        match self {
            Self::Admin => None,
            Self::Client { session_id } => Some(*session_id),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Frame or payload rejected before any coordinator call
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Only text frames are supported")]
    UnsupportedFrame,

    #[error("Invalid message envelope: {0}")]
    InvalidEnvelope(#[source] serde_json::Error),

    #[error(transparent)]
    UnknownType(#[from] UnknownMessageType),

    #[error("Message type {message_type} is not allowed for {role}")]
    NotAllowed {
        message_type: MessageType,
        role: &'static str,
    },

    #[error("Invalid payload for {message_type}: {source}")]
    InvalidPayload {
        message_type: MessageType,
        #[source]
        source: serde_json::Error,
    },
}

impl ProtocolError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedFrame => "UNSUPPORTED_FRAME",
            Self::InvalidEnvelope(_) => "INVALID_MESSAGE",
            Self::UnknownType(_) => "UNKNOWN_MESSAGE_TYPE",
            Self::NotAllowed { .. } => "MESSAGE_TYPE_NOT_ALLOWED",
            Self::InvalidPayload { .. } => "INVALID_PAYLOAD",
        }
    }

    pub fn to_envelope(&self) -> Envelope<ErrorPayload> {
        Envelope::error(self.code(), self.to_string())
    }
}

/// Requests a table client may send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRequest {
    Order(OrderPayload),
    DeleteOrderedProduct(DeleteOrderedProductPayload),
}

/// Requests staff may send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminRequest {
    DeleteOrderedProduct(DeleteOrderedProductPayload),
    UpdateOrderedProductStatus(UpdateOrderedProductStatusPayload),
}

fn open_envelope(text: &str) -> Result<(MessageType, RawEnvelope), ProtocolError> {
    let raw = RawEnvelope::from_text(text).map_err(ProtocolError::InvalidEnvelope)?;
    let message_type = raw.message_type.parse::<MessageType>()?;
    Ok((message_type, raw))
}

fn payload<T: DeserializeOwned>(
    message_type: MessageType,
    raw: &RawEnvelope,
) -> Result<T, ProtocolError> {
    serde_json::from_str(raw.data_json()).map_err(|source| ProtocolError::InvalidPayload {
        message_type,
        source,
    })
}

impl ClientRequest {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let (message_type, raw) = open_envelope(text)?;
        match message_type {
            MessageType::Order => Ok(Self::Order(payload(message_type, &raw)?)),
            MessageType::DeleteOrderedProduct => {
                Ok(Self::DeleteOrderedProduct(payload(message_type, &raw)?))
            }
            _ => Err(ProtocolError::NotAllowed {
                message_type,
                role: "client",
            }),
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Order(_) => MessageType::Order,
            Self::DeleteOrderedProduct(_) => MessageType::DeleteOrderedProduct,
        }
    }
}

impl AdminRequest {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let (message_type, raw) = open_envelope(text)?;
        match message_type {
            MessageType::DeleteOrderedProduct => {
                Ok(Self::DeleteOrderedProduct(payload(message_type, &raw)?))
            }
            MessageType::UpdateOrderedProductStatus => {
                Ok(Self::UpdateOrderedProductStatus(payload(message_type, &raw)?))
            }
            _ => Err(ProtocolError::NotAllowed {
                message_type,
                role: "admin",
            }),
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            Self::DeleteOrderedProduct(_) => MessageType::DeleteOrderedProduct,
            Self::UpdateOrderedProductStatus(_) => MessageType::UpdateOrderedProductStatus,
        }
    }
}
