//! Connection management for WebSocket clients.
//!
//! Tracks live sockets and the outbound channel feeding each one.

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use snowball_domain::ConnectionId;
use snowball_shared::{CloseCode, Packet};

/// Work item for a socket's forwarding task.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Packet(Packet),
    /// Send a close frame with this code and stop forwarding.
    Close(CloseCode),
}

struct ConnectionHandle {
    sender: mpsc::Sender<Outbound>,
    closed: CancellationToken,
}

/// Manages all active WebSocket connections.
pub struct ConnectionManager {
    connections: DashMap<ConnectionId, ConnectionHandle>,
}

impl ConnectionManager {
    /// Create a new connection manager.
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Register a new connection. The returned token fires when the server
    /// force-closes it.
    pub fn register(
        &self,
        connection_id: ConnectionId,
        sender: mpsc::Sender<Outbound>,
    ) -> CancellationToken {
        let closed = CancellationToken::new();
        self.connections.insert(
            connection_id,
            ConnectionHandle {
                sender,
                closed: closed.clone(),
            },
        );
        tracing::debug!(connection_id = %connection_id, "Connection registered");
        closed
    }

    /// Unregister a connection.
    pub fn unregister(&self, connection_id: ConnectionId) {
        if self.connections.remove(&connection_id).is_some() {
            tracing::debug!(connection_id = %connection_id, "Connection unregistered");
        }
    }

    pub fn is_connected(&self, connection_id: ConnectionId) -> bool {
        self.connections.contains_key(&connection_id)
    }

    pub fn count(&self) -> usize {
        self.connections.len()
    }

    /// Queue a packet for one connection.
    pub fn send(&self, connection_id: ConnectionId, packet: Packet) -> Result<(), ConnectionError> {
        let sender = self
            .connections
            .get(&connection_id)
            .map(|handle| handle.sender.clone())
            .ok_or(ConnectionError::NotFound)?;

        sender.try_send(Outbound::Packet(packet)).map_err(|e| {
            tracing::warn!(
                connection_id = %connection_id,
                error = %e,
                "Failed to send packet, channel full or closed"
            );
            ConnectionError::SendFailed
        })
    }

    /// Queue a close frame and signal the receive loop to stop.
    ///
    /// Packets queued earlier are still flushed before the close frame.
    pub fn close(&self, connection_id: ConnectionId, code: CloseCode) -> Result<(), ConnectionError> {
        let (sender, closed) = self
            .connections
            .get(&connection_id)
            .map(|handle| (handle.sender.clone(), handle.closed.clone()))
            .ok_or(ConnectionError::NotFound)?;

        if let Err(e) = sender.try_send(Outbound::Close(code)) {
            tracing::warn!(
                connection_id = %connection_id,
                error = %e,
                "Failed to queue close frame"
            );
        }
        closed.cancel();
        tracing::info!(connection_id = %connection_id, code = code.as_u16(), "Connection closed by server");
        Ok(())
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur during connection operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    #[error("Connection not found")]
    NotFound,
    #[error("Outbound channel full or closed")]
    SendFailed,
}
