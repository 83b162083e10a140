//! `player:action` and the `player:ping` heartbeat.

use std::sync::Arc;

use async_trait::async_trait;

use snowball_domain::{ConnectionId, RoomCategory, RoomKey, Session, UserId};
use snowball_shared::{ops, ActionData};

use super::ws_core::{inputs, packet, reply};
use crate::api::connections::ConnectionManager;
use crate::dispatch::{
    BlockingPacketHandler, ContextToken, DispatchError, PacketHandler, Requirement, Resolved,
};
use crate::infrastructure::ports::{BroadcastRelay, SessionStore, Target};
use crate::use_cases::rooms::RoomService;

/// Commit an action to the session and relay it to the whole room,
/// sender included.
pub(super) struct PlayerActionHandler {
    sessions: Arc<dyn SessionStore>,
    relay: Arc<dyn BroadcastRelay>,
    rooms: Arc<RoomService>,
}

impl PlayerActionHandler {
    pub(super) fn new(
        sessions: Arc<dyn SessionStore>,
        relay: Arc<dyn BroadcastRelay>,
        rooms: Arc<RoomService>,
    ) -> Self {
        Self {
            sessions,
            relay,
            rooms,
        }
    }
}

#[async_trait]
impl PacketHandler for PlayerActionHandler {
    fn requirements(&self) -> Vec<Requirement> {
        vec![
            Requirement::context(inputs::SID, ContextToken::ConnectionId),
            Requirement::context(inputs::USER_ID, ContextToken::UserId),
            Requirement::dependency(inputs::ROOM, self.rooms.requires(RoomCategory::Room)),
            Requirement::payload::<ActionData>(inputs::DATA),
        ]
    }

    async fn handle(&self, resolved: Resolved) -> Result<(), DispatchError> {
        let connection_id = *resolved.get::<ConnectionId>(inputs::SID)?;
        let user_id = *resolved.get::<UserId>(inputs::USER_ID)?;
        let room = *resolved.get::<RoomKey>(inputs::ROOM)?;
        let data = resolved.get::<ActionData>(inputs::DATA)?;
        let namespace = resolved.namespace();

        let action = ActionData::clone(&data).into_action(user_id);
        let committed = action.clone();
        self.sessions
            .mutate(
                connection_id,
                namespace,
                Box::new(move |session: &mut Session| session.record_action(&committed)),
            )
            .await?;

        self.relay
            .publish(
                Target::Room(room),
                packet(ops::PLAYER_ACTION, &action)?,
                namespace,
                None,
            )
            .await?;
        Ok(())
    }
}

/// Heartbeat. Answers straight to the socket without touching shared state.
pub(super) struct PingHandler {
    connections: Arc<ConnectionManager>,
}

impl PingHandler {
    pub(super) fn new(connections: Arc<ConnectionManager>) -> Self {
        Self { connections }
    }
}

impl BlockingPacketHandler for PingHandler {
    fn requirements(&self) -> Vec<Requirement> {
        vec![Requirement::context(inputs::SID, ContextToken::ConnectionId)]
    }

    fn handle(&self, resolved: Resolved) -> Result<(), DispatchError> {
        let connection_id = *resolved.get::<ConnectionId>(inputs::SID)?;
        reply(
            &self.connections,
            connection_id,
            snowball_shared::Packet::empty(ops::PLAYER_PONG),
        )
    }
}
