//! 实时通道消息类型定义
//!
//! 所有 WebSocket 帧都是 UTF-8 JSON 文本：
//!
//! ```json
//! { "type": "ORDER", "data": { "productId": "..." } }
//! ```
//!
//! Inbound frames are first decoded as a [`RawEnvelope`] (the type is kept as
//! a string so unknown types can be reported), outbound frames are built from
//! a typed [`Envelope`].

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt;
use std::str::FromStr;

pub mod payload;
pub use payload::*;

/// 消息类型 (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// 客户点单 (client → server)
    Order,
    /// 点单成功
    OrderOk,
    /// 删除已点菜品 (client / admin → server)
    DeleteOrderedProduct,
    /// 删除成功
    DeleteOrderedProductOk,
    /// 更新出餐状态 (admin → server)
    UpdateOrderedProductStatus,
    /// 状态更新成功
    UpdateOrderedProductStatusOk,
    /// 会话变更通知 (server → all)
    SessionUpdated,
    /// 错误回复 (server → requester)
    Error,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Order => "ORDER",
            Self::OrderOk => "ORDER_OK",
            Self::DeleteOrderedProduct => "DELETE_ORDERED_PRODUCT",
            Self::DeleteOrderedProductOk => "DELETE_ORDERED_PRODUCT_OK",
            Self::UpdateOrderedProductStatus => "UPDATE_ORDERED_PRODUCT_STATUS",
            Self::UpdateOrderedProductStatusOk => "UPDATE_ORDERED_PRODUCT_STATUS_OK",
            Self::SessionUpdated => "SESSION_UPDATED",
            Self::Error => "ERROR",
        }
    }

    /// Acknowledgment type for a request type (`<TYPE>_OK`)
    pub fn ok(&self) -> Option<MessageType> {
        match self {
            Self::Order => Some(Self::OrderOk),
            Self::DeleteOrderedProduct => Some(Self::DeleteOrderedProductOk),
            Self::UpdateOrderedProductStatus => Some(Self::UpdateOrderedProductStatusOk),
            _ => None,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown message type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown message type: {0}")]
pub struct UnknownMessageType(pub String);

impl FromStr for MessageType {
    type Err = UnknownMessageType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ORDER" => Ok(Self::Order),
            "ORDER_OK" => Ok(Self::OrderOk),
            "DELETE_ORDERED_PRODUCT" => Ok(Self::DeleteOrderedProduct),
            "DELETE_ORDERED_PRODUCT_OK" => Ok(Self::DeleteOrderedProductOk),
            "UPDATE_ORDERED_PRODUCT_STATUS" => Ok(Self::UpdateOrderedProductStatus),
            "UPDATE_ORDERED_PRODUCT_STATUS_OK" => Ok(Self::UpdateOrderedProductStatusOk),
            "SESSION_UPDATED" => Ok(Self::SessionUpdated),
            "ERROR" => Ok(Self::Error),
            other => Err(UnknownMessageType(other.to_string())),
        }
    }
}

/// 入站信封 - type 未校验，data 保持原始 JSON
#[derive(Debug, Deserialize)]
pub struct RawEnvelope {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub data: Option<Box<RawValue>>,
}

impl RawEnvelope {
    /// Parse a text frame
    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Raw `data` JSON, `null` when absent
    pub fn data_json(&self) -> &str {
        self.data.as_deref().map(RawValue::get).unwrap_or("null")
    }
}

/// 出站信封
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(message_type: MessageType, data: T) -> Self {
        Self { message_type, data }
    }
}

impl<T: Serialize> Envelope<T> {
    /// 序列化为文本帧
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Envelope<ErrorPayload> {
    /// 创建错误帧
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            MessageType::Error,
            ErrorPayload {
                code: code.into(),
                message: message.into(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_round_trip_names() {
        for ty in [
            MessageType::Order,
            MessageType::OrderOk,
            MessageType::DeleteOrderedProduct,
            MessageType::DeleteOrderedProductOk,
            MessageType::UpdateOrderedProductStatus,
            MessageType::UpdateOrderedProductStatusOk,
            MessageType::SessionUpdated,
            MessageType::Error,
        ] {
            let json = serde_json::to_string(&ty).unwrap();
            assert_eq!(json, format!("\"{}\"", ty.as_str()));
            assert_eq!(ty.as_str().parse::<MessageType>().unwrap(), ty);
        }
    }

    #[test]
    fn test_unknown_type() {
        let err = "PAY".parse::<MessageType>().unwrap_err();
        assert_eq!(err, UnknownMessageType("PAY".to_string()));
    }

    #[test]
    fn test_ok_types() {
        assert_eq!(MessageType::Order.ok(), Some(MessageType::OrderOk));
        assert_eq!(
            MessageType::UpdateOrderedProductStatus.ok(),
            Some(MessageType::UpdateOrderedProductStatusOk)
        );
        assert_eq!(MessageType::OrderOk.ok(), None);
    }

    #[test]
    fn test_raw_envelope_keeps_data() {
        let raw = RawEnvelope::from_text(r#"{"type":"ORDER","data":{"productId":"x"}}"#).unwrap();
        assert_eq!(raw.message_type, "ORDER");
        assert_eq!(raw.data_json(), r#"{"productId":"x"}"#);

        let raw = RawEnvelope::from_text(r#"{"type":"ORDER"}"#).unwrap();
        assert_eq!(raw.data_json(), "null");
    }

    #[test]
    fn test_error_frame() {
        let text = Envelope::error("SESSION_NOT_OPEN", "Session is not open")
            .to_text()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "ERROR");
        assert_eq!(value["data"]["code"], "SESSION_NOT_OPEN");
    }
}
