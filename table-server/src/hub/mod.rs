//! Hub - 在线连接注册表
//!
//! # 架构
//!
//! ```text
//! ConnectionSession ──┐
//! HTTP handlers ──────┼──▶ HubHandle ──mpsc──▶ Hub::run (单一所有者)
//! Dispatcher ─────────┘                          │
//!                                                ▼
//!                                   ConnectionSink::try_deliver
//!                                   (per-connection bounded queue)
//! ```
//!
//! The owner loop holds both membership maps. Callers only enqueue commands,
//! so registration, removal and fan-out are applied in one serialized order:
//! once an unregister has been processed, no later broadcast reaches that
//! connection.

mod sink;

pub use sink::{ConnectionSink, DeliveryError, OutboundQueue};

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Identifier of one live connection
pub type ConnectionId = Uuid;

/// One message to fan out
#[derive(Debug, Clone)]
pub struct Broadcast {
    /// Pre-serialized frame, shared by every recipient
    pub frame: Arc<str>,
    /// Clients of this session receive it; `None` means staff only
    pub target_session: Option<Uuid>,
    /// Connection that caused it (already acknowledged directly)
    pub origin: Option<ConnectionId>,
}

impl Broadcast {
    pub fn to_session(frame: impl Into<Arc<str>>, session_id: Uuid) -> Self {
        Self {
            frame: frame.into(),
            target_session: Some(session_id),
            origin: None,
        }
    }

    pub fn to_admins(frame: impl Into<Arc<str>>) -> Self {
        Self {
            frame: frame.into(),
            target_session: None,
            origin: None,
        }
    }

    pub fn excluding(mut self, origin: ConnectionId) -> Self {
        self.origin = Some(origin);
        self
    }
}

/// Registry counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub admins: usize,
    pub clients: usize,
}

enum HubCommand {
    RegisterClient {
        id: ConnectionId,
        session_id: Uuid,
        sink: Arc<dyn ConnectionSink>,
    },
    RegisterAdmin {
        id: ConnectionId,
        sink: Arc<dyn ConnectionSink>,
    },
    UnregisterClient(ConnectionId),
    UnregisterAdmin(ConnectionId),
    Broadcast(Broadcast),
    Stats(oneshot::Sender<HubStats>),
}

struct ClientEntry {
    session_id: Uuid,
    sink: Arc<dyn ConnectionSink>,
}

/// Cheap, cloneable front of the Hub
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: mpsc::UnboundedSender<HubCommand>,
}

impl std::fmt::Debug for HubCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RegisterClient { id, session_id, .. } => f
                .debug_struct("RegisterClient")
                .field("id", id)
                .field("session_id", session_id)
                .finish(),
            Self::RegisterAdmin { id, .. } => {
                f.debug_struct("RegisterAdmin").field("id", id).finish()
            }
            Self::UnregisterClient(id) => f.debug_tuple("UnregisterClient").field(id).finish(),
            Self::UnregisterAdmin(id) => f.debug_tuple("UnregisterAdmin").field(id).finish(),
            Self::Broadcast(b) => f.debug_tuple("Broadcast").field(b).finish(),
            Self::Stats(_) => f.write_str("Stats"),
        }
    }
}

impl HubHandle {
    fn send(&self, command: HubCommand) {
        if let Err(e) = self.tx.send(command) {
            // Owner loop has stopped (shutdown)
            tracing::debug!(command = ?e.0, "Hub is not running, command dropped");
        }
    }

    pub fn register_client(
        &self,
        id: ConnectionId,
        session_id: Uuid,
        sink: Arc<dyn ConnectionSink>,
    ) {
        self.send(HubCommand::RegisterClient {
            id,
            session_id,
            sink,
        });
    }

    pub fn register_admin(&self, id: ConnectionId, sink: Arc<dyn ConnectionSink>) {
        self.send(HubCommand::RegisterAdmin { id, sink });
    }

    pub fn unregister_client(&self, id: ConnectionId) {
        self.send(HubCommand::UnregisterClient(id));
    }

    pub fn unregister_admin(&self, id: ConnectionId) {
        self.send(HubCommand::UnregisterAdmin(id));
    }

    pub fn broadcast(&self, broadcast: Broadcast) {
        self.send(HubCommand::Broadcast(broadcast));
    }

    /// Current membership counts; `None` once the Hub has stopped
    ///
    /// Commands are applied in order, so awaiting this also waits for every
    /// command this handle sent before it.
    pub async fn stats(&self) -> Option<HubStats> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(HubCommand::Stats(tx)).ok()?;
        rx.await.ok()
    }
}

/// 连接注册表 (单一所有者)
pub struct Hub {
    rx: mpsc::UnboundedReceiver<HubCommand>,
    clients: HashMap<ConnectionId, ClientEntry>,
    admins: HashMap<ConnectionId, Arc<dyn ConnectionSink>>,
}

impl Hub {
    pub fn new() -> (Self, HubHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let hub = Self {
            rx,
            clients: HashMap::new(),
            admins: HashMap::new(),
        };
        (hub, HubHandle { tx })
    }

    /// Construct and spawn the owner loop
    pub fn spawn(shutdown: CancellationToken) -> (HubHandle, JoinHandle<()>) {
        let (hub, handle) = Self::new();
        let task = tokio::spawn(hub.run(shutdown));
        (handle, task)
    }

    /// Owner loop; returns when `shutdown` is cancelled or every handle is dropped
    pub async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!("Hub started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Hub received shutdown signal");
                    break;
                }
                command = self.rx.recv() => {
                    match command {
                        Some(command) => self.apply(command),
                        None => {
                            tracing::debug!("All hub handles dropped");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!(
            admins = self.admins.len(),
            clients = self.clients.len(),
            "Hub stopped"
        );
    }

    fn apply(&mut self, command: HubCommand) {
        match command {
            HubCommand::RegisterClient {
                id,
                session_id,
                sink,
            } => {
                if self.clients.contains_key(&id) {
                    tracing::debug!(connection_id = %id, "Client already registered");
                    return;
                }
                self.clients.insert(id, ClientEntry { session_id, sink });
                tracing::info!(
                    connection_id = %id,
                    session_id = %session_id,
                    total = self.clients.len(),
                    "Client registered"
                );
            }
            HubCommand::RegisterAdmin { id, sink } => {
                if self.admins.contains_key(&id) {
                    tracing::debug!(connection_id = %id, "Admin already registered");
                    return;
                }
                self.admins.insert(id, sink);
                tracing::info!(connection_id = %id, total = self.admins.len(), "Admin registered");
            }
            HubCommand::UnregisterClient(id) => {
                if self.clients.remove(&id).is_some() {
                    tracing::info!(connection_id = %id, total = self.clients.len(), "Client unregistered");
                }
            }
            HubCommand::UnregisterAdmin(id) => {
                if self.admins.remove(&id).is_some() {
                    tracing::info!(connection_id = %id, total = self.admins.len(), "Admin unregistered");
                }
            }
            HubCommand::Broadcast(broadcast) => self.fan_out(&broadcast),
            HubCommand::Stats(reply) => {
                let _ = reply.send(HubStats {
                    admins: self.admins.len(),
                    clients: self.clients.len(),
                });
            }
        }
    }

    fn fan_out(&self, broadcast: &Broadcast) {
        let admins = self.admins.iter().map(|(id, sink)| (id, sink));
        let clients = self
            .clients
            .iter()
            .filter(|(_, entry)| Some(entry.session_id) == broadcast.target_session)
            .map(|(id, entry)| (id, &entry.sink));

        let mut delivered = 0usize;
        for (id, sink) in admins.chain(clients) {
            if broadcast.origin == Some(*id) {
                continue;
            }
            match sink.try_deliver(broadcast.frame.clone()) {
                Ok(()) => delivered += 1,
                Err(DeliveryError::Full) => {
                    tracing::warn!(connection_id = %id, "Outbound queue full, frame dropped");
                }
                Err(DeliveryError::Closed) => {
                    // Read loop will unregister it
                    tracing::debug!(connection_id = %id, "Connection closed, frame skipped");
                }
            }
        }

        tracing::trace!(
            target_session = ?broadcast.target_session,
            delivered,
            "Broadcast delivered"
        );
    }
}
