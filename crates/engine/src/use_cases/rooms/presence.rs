//! Presence reactors.
//!
//! Presence is derived on demand from room membership (relay), live state
//! (session) and the account record. Members whose session or account has
//! gone missing are left out of snapshots rather than failing the join.

use std::sync::Arc;

use async_trait::async_trait;

use snowball_domain::{ConnectionId, Player, RoomCategory, RoomKey, Session, UserRecord};
use snowball_shared::{ops, Packet, RoomJoinResponse};

use crate::events::{EventHandler, LocalEvent, ReactorError};
use crate::infrastructure::ports::{AccountRepo, BroadcastRelay, SessionStore, Target};

/// Sends join snapshots and add/remove notices.
pub struct PresenceReactor {
    sessions: Arc<dyn SessionStore>,
    accounts: Arc<dyn AccountRepo>,
    relay: Arc<dyn BroadcastRelay>,
}

impl PresenceReactor {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        accounts: Arc<dyn AccountRepo>,
        relay: Arc<dyn BroadcastRelay>,
    ) -> Self {
        Self {
            sessions,
            accounts,
            relay,
        }
    }

    async fn account_for(&self, session: &Session) -> Result<Option<UserRecord>, ReactorError> {
        match session.user_id {
            Some(user_id) => Ok(self.accounts.fetch_user_by_id(user_id).await?),
            None => Ok(None),
        }
    }

    /// Presence record for one connection, if it still has a session and
    /// an account.
    async fn presence_of(
        &self,
        connection_id: ConnectionId,
        namespace: &str,
    ) -> Result<Option<Player>, ReactorError> {
        let Some(session) = self.sessions.get(connection_id, namespace).await? else {
            return Ok(None);
        };
        Ok(self
            .account_for(&session)
            .await?
            .map(|user| Player::from_session(user, &session)))
    }

    async fn on_join(
        &self,
        joiner: ConnectionId,
        room: RoomKey,
        namespace: &str,
    ) -> Result<(), ReactorError> {
        let me = self.presence_of(joiner, namespace).await?;

        let mut players = Vec::new();
        if let Some(me) = &me {
            players.push(me.clone());
        }
        for member in self.relay.members_of(room, namespace).await? {
            if member == joiner {
                continue;
            }
            match self.presence_of(member, namespace).await? {
                Some(player) => players.push(player),
                None => {
                    tracing::debug!(
                        connection_id = %member,
                        room = %room,
                        "Dropping stale member from presence snapshot"
                    );
                }
            }
        }

        let snapshot_op = match room.category() {
            RoomCategory::Room => ops::ROOM_JOIN,
            RoomCategory::Game => ops::GAME_JOIN,
        };
        let snapshot = RoomJoinResponse {
            room_id: room.id(),
            players,
            waddles: Vec::new(),
        };
        self.relay
            .publish(
                Target::Connection(joiner),
                Packet::new(snapshot_op, &snapshot)?,
                namespace,
                None,
            )
            .await?;

        match me {
            Some(me) => {
                self.relay
                    .publish(
                        Target::Room(room),
                        Packet::new(ops::PLAYER_ADD, &me)?,
                        namespace,
                        Some(joiner),
                    )
                    .await?;
            }
            None => {
                tracing::warn!(
                    connection_id = %joiner,
                    room = %room,
                    "Joining connection has no account record, not announcing"
                );
            }
        }
        Ok(())
    }

    async fn announce_departure(
        &self,
        leaver: ConnectionId,
        session: Option<&Session>,
        room: RoomKey,
        namespace: &str,
    ) -> Result<(), ReactorError> {
        let Some(session) = session else {
            tracing::debug!(connection_id = %leaver, room = %room, "No session, skipping remove notice");
            return Ok(());
        };
        let Some(user) = self.account_for(session).await? else {
            tracing::debug!(connection_id = %leaver, room = %room, "No account, skipping remove notice");
            return Ok(());
        };

        self.relay
            .publish(
                Target::Room(room),
                Packet::new(ops::PLAYER_REMOVE, Player::departed(user))?,
                namespace,
                Some(leaver),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl EventHandler for PresenceReactor {
    fn name(&self) -> &'static str {
        "presence"
    }

    async fn handle(&self, event: &LocalEvent) -> Result<(), ReactorError> {
        match event {
            LocalEvent::RoomJoin {
                connection_id,
                room,
                namespace,
            } => self.on_join(*connection_id, *room, namespace).await,
            LocalEvent::RoomLeave {
                connection_id,
                room,
                namespace,
            } => {
                let session = self.sessions.get(*connection_id, namespace).await?;
                self.announce_departure(*connection_id, session.as_ref(), *room, namespace)
                    .await
            }
            LocalEvent::UserDisconnect {
                connection_id,
                namespace,
                session,
                rooms,
            } => {
                // One failing room must not cost the others their notice
                for room in rooms {
                    if let Err(e) = self
                        .announce_departure(*connection_id, session.as_ref(), *room, namespace)
                        .await
                    {
                        tracing::warn!(
                            connection_id = %connection_id,
                            room = %room,
                            error = %e,
                            "Failed to announce departure"
                        );
                    }
                }
                Ok(())
            }
            LocalEvent::UserConnect { .. } | LocalEvent::UserAuth { .. } => Ok(()),
        }
    }
}

/// Logs connection lifecycle events.
pub struct AuditReactor;

#[async_trait]
impl EventHandler for AuditReactor {
    fn name(&self) -> &'static str {
        "audit"
    }

    async fn handle(&self, event: &LocalEvent) -> Result<(), ReactorError> {
        match event {
            LocalEvent::UserConnect { connection_id } => {
                tracing::info!(connection_id = %connection_id, "Connection opened");
            }
            LocalEvent::UserAuth {
                connection_id,
                user_id,
            } => {
                tracing::info!(connection_id = %connection_id, user_id = %user_id, "Connection authenticated");
            }
            LocalEvent::UserDisconnect {
                connection_id,
                rooms,
                ..
            } => {
                tracing::info!(
                    connection_id = %connection_id,
                    rooms = rooms.len(),
                    "Connection closed"
                );
            }
            _ => {}
        }
        Ok(())
    }
}
