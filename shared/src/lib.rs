//! Shared types for the table ordering server
//!
//! Domain models and wire types used by the server and by any client that
//! talks to it over WebSocket or HTTP.

pub mod message;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Wire envelope re-exports (for convenient access)
pub use message::{Envelope, MessageType, RawEnvelope};
