//! Session store, broadcast relay and token verification ports.

use async_trait::async_trait;

use snowball_domain::{ConnectionId, RoomKey, Session, UserId};
use snowball_shared::{CloseCode, Packet};

use super::error::{RelayError, SessionError, TokenError};

/// In-place edit applied to a session while the store holds it exclusively.
pub type SessionMutation = Box<dyn FnOnce(&mut Session) + Send>;

/// Per-connection mutable state, keyed by connection and namespace.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(
        &self,
        connection_id: ConnectionId,
        namespace: &str,
    ) -> Result<Option<Session>, SessionError>;

    async fn save(
        &self,
        connection_id: ConnectionId,
        namespace: &str,
        session: Session,
    ) -> Result<(), SessionError>;

    /// Atomic read-modify-write. Returns the session as written.
    async fn mutate(
        &self,
        connection_id: ConnectionId,
        namespace: &str,
        mutation: SessionMutation,
    ) -> Result<Session, SessionError>;

    async fn remove(
        &self,
        connection_id: ConnectionId,
        namespace: &str,
    ) -> Result<Option<Session>, SessionError>;
}

/// Where a published packet goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Connection(ConnectionId),
    Room(RoomKey),
}

/// Room membership and fan-out. The single source of truth for who is in
/// which room.
#[async_trait]
pub trait BroadcastRelay: Send + Sync {
    async fn enter(
        &self,
        connection_id: ConnectionId,
        room: RoomKey,
        namespace: &str,
    ) -> Result<(), RelayError>;

    async fn leave(
        &self,
        connection_id: ConnectionId,
        room: RoomKey,
        namespace: &str,
    ) -> Result<(), RelayError>;

    async fn members_of(
        &self,
        room: RoomKey,
        namespace: &str,
    ) -> Result<Vec<ConnectionId>, RelayError>;

    async fn rooms_of(
        &self,
        connection_id: ConnectionId,
        namespace: &str,
    ) -> Result<Vec<RoomKey>, RelayError>;

    /// Deliver `packet` to `target`, skipping `skip` when it is a member.
    async fn publish(
        &self,
        target: Target,
        packet: Packet,
        namespace: &str,
        skip: Option<ConnectionId>,
    ) -> Result<(), RelayError>;

    /// Force-close a connection with a reason code.
    async fn disconnect(
        &self,
        connection_id: ConnectionId,
        namespace: &str,
        code: CloseCode,
    ) -> Result<(), RelayError>;

    /// Drop every membership of a connection, returning the rooms it was in.
    async fn leave_all(
        &self,
        connection_id: ConnectionId,
        namespace: &str,
    ) -> Result<Vec<RoomKey>, RelayError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<UserId, TokenError>;
}
