//! Ordered Product Model

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kitchen status of an ordered product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderedProductStatus {
    /// 已下单，厨房未接单 (guests may still cancel)
    Pending,
    /// 制作中
    Preparing,
    /// 已出餐
    Done,
}

impl fmt::Display for OrderedProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Preparing => write!(f, "preparing"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// One placed item tied to a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedProduct {
    pub id: Uuid,
    pub product_id: Uuid,
    pub session_id: Uuid,
    pub status: OrderedProductStatus,
    /// Creation time (epoch millis)
    pub created_at: i64,
}

impl OrderedProduct {
    /// Create a freshly placed, `Pending` item
    pub fn new(product_id: Uuid, session_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            session_id,
            status: OrderedProductStatus::Pending,
            created_at: crate::util::now_millis(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == OrderedProductStatus::Done
    }
}
