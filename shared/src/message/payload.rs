use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::OrderedProductStatus;

// ==================== Client Requests ====================

/// `ORDER` 载荷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    pub product_id: Uuid,
}

/// `DELETE_ORDERED_PRODUCT` 载荷 (client and admin)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOrderedProductPayload {
    pub ordered_product_id: Uuid,
}

// ==================== Admin Requests ====================

/// `UPDATE_ORDERED_PRODUCT_STATUS` 载荷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderedProductStatusPayload {
    pub ordered_product_id: Uuid,
    pub status: OrderedProductStatus,
}

// ==================== Replies ====================

/// `ERROR` 载荷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Stable machine-readable code, e.g. `SESSION_NOT_OPEN`
    pub code: String,
    /// Human-readable message
    pub message: String,
}
