//! 实时消息协议
//!
//! - `protocol`: inbound frame decoding into per-role request types
//! - `dispatch`: request execution, acknowledgment and broadcast

pub mod dispatch;
pub mod protocol;

pub use dispatch::{Caller, Dispatcher};
pub use protocol::{AdminRequest, ClientRequest, ProtocolError, Role};
