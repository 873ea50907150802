//! Broadcast gateway.
//!
//! Game logic produces [`Outbound`] messages addressed to connections; the
//! gateway serializes them and pushes them onto each connection's outbound
//! queue. Sends are fire-and-forget: a closed queue is dropped and never
//! feeds back into game state.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::player::ConnectionId;
use super::protocol::ServerEvent;

/// Per-connection queue of serialized outbound messages.
pub type ConnectionSender = mpsc::UnboundedSender<String>;

/// A message for one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub connection: ConnectionId,
    pub event: ServerEvent,
}

impl Outbound {
    pub fn new(connection: ConnectionId, event: ServerEvent) -> Self {
        Self { connection, event }
    }
}

/// Fans outbound messages out to registered connections.
#[derive(Debug, Default)]
pub struct Gateway {
    senders: HashMap<ConnectionId, ConnectionSender>,
}

impl Gateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the outbound queue of a freshly opened connection.
    pub fn register(&mut self, connection: ConnectionId, sender: ConnectionSender) {
        self.senders.insert(connection, sender);
    }

    /// Forget a connection. Returns whether it was registered.
    pub fn unregister(&mut self, connection: ConnectionId) -> bool {
        self.senders.remove(&connection).is_some()
    }

    pub fn is_registered(&self, connection: ConnectionId) -> bool {
        self.senders.contains_key(&connection)
    }

    /// Deliver messages in order. Returns how many were queued.
    pub fn deliver(&mut self, outbound: Vec<Outbound>) -> usize {
        let mut delivered = 0;

        for message in outbound {
            let Some(sender) = self.senders.get(&message.connection) else {
                debug!(connection = %message.connection, "Dropping message for unknown connection");
                continue;
            };

            let payload = match message.event.to_json_string() {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(connection = %message.connection, error = %err, "Failed to serialize outbound message");
                    continue;
                }
            };

            if sender.send(payload).is_err() {
                warn!(connection = %message.connection, "Outbound queue closed, dropping connection");
                self.senders.remove(&message.connection);
                continue;
            }
            delivered += 1;
        }

        delivered
    }

    /// Count registered connections.
    pub fn count(&self) -> usize {
        self.senders.len()
    }
}
