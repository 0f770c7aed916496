//! Order Session Model

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 桌台点餐会话状态
///
/// `Closed` → `Open` → `Paid`. A paid session may be reopened by staff for
/// the next service cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// 未开台 (initial / reusable)
    Closed,
    /// 营业中，接受点单
    Open,
    /// 已结账
    Paid,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::Paid => write!(f, "paid"),
        }
    }
}

/// Order session entity (一桌一会话)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSession {
    pub id: Uuid,
    pub table_number: i32,
    pub status: SessionStatus,
}

impl OrderSession {
    /// Create a session in the initial `Closed` state
    pub fn new(table_number: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            table_number,
            status: SessionStatus::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }
}

/// Update order session payload
///
/// Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSessionUpdate {
    pub table_number: Option<i32>,
    pub status: Option<SessionStatus>,
}

impl OrderSessionUpdate {
    pub fn is_empty(&self) -> bool {
        self.table_number.is_none() && self.status.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_starts_closed() {
        let session = OrderSession::new(4);
        assert_eq!(session.table_number, 4);
        assert_eq!(session.status, SessionStatus::Closed);
        assert!(!session.is_open());
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&SessionStatus::Paid).unwrap();
        assert_eq!(json, "\"paid\"");
        let parsed: SessionStatus = serde_json::from_str("\"open\"").unwrap();
        assert_eq!(parsed, SessionStatus::Open);
    }

    #[test]
    fn test_empty_update() {
        assert!(OrderSessionUpdate::default().is_empty());
        let update = OrderSessionUpdate {
            table_number: Some(2),
            status: None,
        };
        assert!(!update.is_empty());
    }
}
