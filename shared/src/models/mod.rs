//! Data models
//!
//! Shared between the server and its clients (via WebSocket frames and the HTTP API).
//! All IDs are v4 `Uuid`s; money is `rust_decimal::Decimal`, serialized as a string.

pub mod bill;
pub mod order_session;
pub mod ordered_product;
pub mod product;

// Re-exports
pub use bill::*;
pub use order_session::*;
pub use ordered_product::*;
pub use product::*;
