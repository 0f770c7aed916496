//! Write side of a live connection as seen by the Hub
//!
//! The Hub never touches sockets. It hands pre-serialized frames to a
//! [`ConnectionSink`], which must return immediately.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

/// Why a frame could not be queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Outbound queue is full (slow or stalled peer)
    #[error("outbound queue full")]
    Full,
    /// Writer side has gone away
    #[error("connection closed")]
    Closed,
}

/// Non-blocking frame delivery to one connection
pub trait ConnectionSink: Send + Sync + 'static {
    fn try_deliver(&self, frame: Arc<str>) -> Result<(), DeliveryError>;
}

/// Bounded per-connection outbound queue
///
/// Drained by the connection's writer task. Cloning shares the same queue,
/// so direct replies and broadcasts are written in enqueue order.
#[derive(Debug, Clone)]
pub struct OutboundQueue {
    tx: mpsc::Sender<Arc<str>>,
}

impl OutboundQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl ConnectionSink for OutboundQueue {
    fn try_deliver(&self, frame: Arc<str>) -> Result<(), DeliveryError> {
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}
