//! axum WebSocket binding
//!
//! Splits the socket: the read half feeds [`ConnectionSession::run`], the
//! write half is owned by a writer task draining the connection's
//! [`OutboundQueue`] with a bounded per-write timeout.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{ConnectionSession, InboundFrame};
use crate::hub::OutboundQueue;
use crate::message::{Dispatcher, Role};

/// Per-connection transport settings
#[derive(Debug, Clone, Copy)]
pub struct SocketConfig {
    pub queue_capacity: usize,
    pub write_timeout: Duration,
}

impl From<Message> for InboundFrame {
    fn from(message: Message) -> Self {
        match message {
            Message::Text(text) => Self::Text(text.as_str().to_owned()),
            Message::Binary(bytes) => Self::Binary(bytes.to_vec()),
            Message::Ping(_) => Self::Ping,
            Message::Pong(_) => Self::Pong,
            Message::Close(_) => Self::Close,
        }
    }
}

/// Serve one upgraded socket until it closes or `shutdown` fires
pub async fn serve_socket(
    socket: WebSocket,
    role: Role,
    dispatcher: Dispatcher,
    config: SocketConfig,
    shutdown: CancellationToken,
) {
    let (sink, stream) = socket.split();
    let token = shutdown.child_token();
    let (outbound, rx) = OutboundQueue::new(config.queue_capacity);

    let session = ConnectionSession::new(role, dispatcher, outbound, token.clone());
    let connection_id = session.connection_id();
    let writer = tokio::spawn(write_loop(
        sink,
        rx,
        token,
        config.write_timeout,
        connection_id,
    ));

    session.run(stream.map(|r| r.map(InboundFrame::from))).await;

    if let Err(e) = writer.await {
        tracing::warn!(connection_id = %connection_id, error = %e, "Writer task failed");
    }
}

/// Drain the outbound queue into the socket
///
/// A failed or timed-out write cancels the connection token, which ends the
/// read loop and unregisters the connection.
async fn write_loop<W>(
    mut sink: W,
    mut rx: mpsc::Receiver<Arc<str>>,
    token: CancellationToken,
    write_timeout: Duration,
    connection_id: uuid::Uuid,
) where
    W: Sink<Message> + Unpin,
    W::Error: std::fmt::Display,
{
    loop {
        let frame = tokio::select! {
            _ = token.cancelled() => break,
            frame = rx.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        let message = Message::Text(frame.to_string().into());
        match tokio::time::timeout(write_timeout, sink.send(message)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(connection_id = %connection_id, error = %e, "Socket write failed");
                token.cancel();
                break;
            }
            Err(_) => {
                tracing::warn!(
                    connection_id = %connection_id,
                    timeout_ms = write_timeout.as_millis() as u64,
                    "Socket write timed out"
                );
                token.cancel();
                break;
            }
        }
    }

    let _ = tokio::time::timeout(write_timeout, sink.close()).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::ConnectionSink;
    use futures::channel::mpsc as fmpsc;

    #[test]
    fn test_frame_conversion() {
        assert_eq!(
            InboundFrame::from(Message::Text("hi".into())),
            InboundFrame::Text("hi".to_string())
        );
        assert_eq!(
            InboundFrame::from(Message::Binary(vec![7u8].into())),
            InboundFrame::Binary(vec![7])
        );
        assert_eq!(InboundFrame::from(Message::Close(None)), InboundFrame::Close);
    }

    #[tokio::test]
    async fn test_writer_forwards_frames() {
        let (sink, mut written) = fmpsc::unbounded::<Message>();
        let (queue, rx) = OutboundQueue::new(4);
        let token = CancellationToken::new();
        let writer = tokio::spawn(write_loop(
            sink,
            rx,
            token.clone(),
            Duration::from_secs(1),
            uuid::Uuid::new_v4(),
        ));

        queue.try_deliver(Arc::from("one")).unwrap();
        queue.try_deliver(Arc::from("two")).unwrap();

        assert_eq!(written.next().await, Some(Message::Text("one".into())));
        assert_eq!(written.next().await, Some(Message::Text("two".into())));

        token.cancel();
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_write_failure_cancels_connection() {
        let (sink, written) = fmpsc::unbounded::<Message>();
        drop(written);
        let (queue, rx) = OutboundQueue::new(4);
        let token = CancellationToken::new();
        let writer = tokio::spawn(write_loop(
            sink,
            rx,
            token.clone(),
            Duration::from_secs(1),
            uuid::Uuid::new_v4(),
        ));

        queue.try_deliver(Arc::from("lost")).unwrap();
        writer.await.unwrap();
        assert!(token.is_cancelled());
    }
}
