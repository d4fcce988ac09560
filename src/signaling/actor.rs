use std::collections::HashMap;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::router::{Outbox, Router, dispatch};
use super::types::{ConnectionId, OutboundMessage, RegistryStats, SignalingError};

/// Commands sent to the room manager actor
pub(crate) enum RoomCommand {
    Register {
        connection: ConnectionId,
        peer_tx: mpsc::Sender<OutboundMessage>,
    },
    Inbound {
        connection: ConnectionId,
        text: String,
    },
    Disconnect {
        connection: ConnectionId,
    },
    Stats {
        reply: oneshot::Sender<RegistryStats>,
    },
}

/// Frames buffered per connection before new ones are dropped
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Live connections and their outbound channels
#[derive(Default)]
struct ConnectionTable {
    peers: HashMap<ConnectionId, mpsc::Sender<OutboundMessage>>,
}

impl Outbox for ConnectionTable {
    fn send(&mut self, to: ConnectionId, message: OutboundMessage) {
        match self.peers.get(&to) {
            Some(tx) => match tx.try_send(message) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    debug!("Outbound queue for {} full, dropping message", to)
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("Outbound channel for {} closed, dropping message", to)
                }
            },
            None => debug!("No channel for {}, dropping message", to),
        }
    }
}

/// Owns the router and every connection's sender. One command at a time, so
/// each join/leave and the notifications it triggers are computed atomically.
pub(crate) async fn room_manager_actor(mut rx: mpsc::Receiver<RoomCommand>) {
    let mut router = Router::new();
    let mut table = ConnectionTable::default();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            RoomCommand::Register {
                connection,
                peer_tx,
            } => {
                table.peers.insert(connection, peer_tx);
                debug!("Registered {}", connection);
            }

            RoomCommand::Inbound { connection, text } => {
                let batches = router.handle_text(connection, &text);
                dispatch(&mut table, batches);
            }

            RoomCommand::Disconnect { connection } => {
                let batches = router.handle_disconnect(connection);
                table.peers.remove(&connection);
                dispatch(&mut table, batches);
                debug!("Unregistered {}", connection);
            }

            RoomCommand::Stats { reply } => {
                let _ = reply.send(router.stats());
            }
        }
    }

    info!("Room manager stopped");
}

/// Handle to communicate with the room manager actor
#[derive(Clone)]
pub struct RoomManagerHandle {
    pub(crate) tx: mpsc::Sender<RoomCommand>,
}

impl RoomManagerHandle {
    /// Spawn the actor on the current runtime
    pub fn spawn(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel::<RoomCommand>(capacity);
        tokio::spawn(room_manager_actor(rx));
        Self { tx }
    }

    /// Attach a connection's outbound channel; it stays unjoined until it sends join-room
    pub async fn register(
        &self,
        connection: ConnectionId,
        peer_tx: mpsc::Sender<OutboundMessage>,
    ) {
        let _ = self
            .tx
            .send(RoomCommand::Register {
                connection,
                peer_tx,
            })
            .await;
    }

    /// Forward one inbound text frame
    pub async fn inbound(&self, connection: ConnectionId, text: impl Into<String>) {
        let _ = self
            .tx
            .send(RoomCommand::Inbound {
                connection,
                text: text.into(),
            })
            .await;
    }

    /// The transport closed the connection
    pub async fn disconnect(&self, connection: ConnectionId) {
        let _ = self.tx.send(RoomCommand::Disconnect { connection }).await;
    }

    pub async fn stats(&self) -> Result<RegistryStats, SignalingError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(RoomCommand::Stats { reply: reply_tx })
            .await
            .map_err(|_| SignalingError::Internal("actor channel closed".to_string()))?;
        reply_rx
            .await
            .map_err(|_| SignalingError::Internal("actor channel closed".to_string()))
    }
}
