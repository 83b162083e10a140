//! Minigame flow: `game:join`, `game:start`, `game:over`.

use std::sync::Arc;

use async_trait::async_trait;

use snowball_domain::{ConnectionId, RoomCategory, RoomKey, Session};
use snowball_shared::{
    ops, GameJoinData, GameOverData, GameOverResponse, GameStartData, GameStartResponse,
};

use super::ws_core::{inputs, packet, reply};
use crate::api::connections::ConnectionManager;
use crate::dispatch::{
    BlockingPacketHandler, ContextToken, DispatchError, PacketHandler, Requirement, Resolved,
};
use crate::use_cases::rooms::RoomService;

/// Leave the current room and enter `games:<id>` at the same position.
pub(super) struct GameJoinHandler {
    rooms: Arc<RoomService>,
}

impl GameJoinHandler {
    pub(super) fn new(rooms: Arc<RoomService>) -> Self {
        Self { rooms }
    }
}

#[async_trait]
impl PacketHandler for GameJoinHandler {
    fn requirements(&self) -> Vec<Requirement> {
        vec![
            Requirement::context(inputs::SID, ContextToken::ConnectionId),
            Requirement::context(inputs::SESSION, ContextToken::Session),
            Requirement::payload::<GameJoinData>(inputs::DATA),
        ]
    }

    async fn handle(&self, resolved: Resolved) -> Result<(), DispatchError> {
        let connection_id = *resolved.get::<ConnectionId>(inputs::SID)?;
        let session = resolved.get::<Session>(inputs::SESSION)?;
        let data = resolved.get::<GameJoinData>(inputs::DATA)?;
        let namespace = resolved.namespace();

        self.rooms
            .leave_current(connection_id, RoomCategory::Room, namespace)
            .await?;
        self.rooms
            .join_room(
                connection_id,
                RoomKey::game(data.game_id),
                session.x,
                session.y,
                namespace,
            )
            .await
    }
}

pub(super) struct GameStartHandler {
    connections: Arc<ConnectionManager>,
}

impl GameStartHandler {
    pub(super) fn new(connections: Arc<ConnectionManager>) -> Self {
        Self { connections }
    }
}

impl BlockingPacketHandler for GameStartHandler {
    fn requirements(&self) -> Vec<Requirement> {
        vec![
            Requirement::context(inputs::SID, ContextToken::ConnectionId),
            Requirement::payload::<GameStartData>(inputs::DATA),
        ]
    }

    fn handle(&self, resolved: Resolved) -> Result<(), DispatchError> {
        let connection_id = *resolved.get::<ConnectionId>(inputs::SID)?;
        let data = resolved.get::<GameStartData>(inputs::DATA)?;
        let response = GameStartResponse {
            game_id: data.game_id.clone(),
        };
        reply(&self.connections, connection_id, packet(ops::GAME_START, &response)?)
    }
}

/// Pay out the score and leave the game, if still in one.
pub(super) struct GameOverHandler {
    connections: Arc<ConnectionManager>,
    rooms: Arc<RoomService>,
}

impl GameOverHandler {
    pub(super) fn new(connections: Arc<ConnectionManager>, rooms: Arc<RoomService>) -> Self {
        Self { connections, rooms }
    }
}

#[async_trait]
impl PacketHandler for GameOverHandler {
    fn requirements(&self) -> Vec<Requirement> {
        vec![
            Requirement::context(inputs::SID, ContextToken::ConnectionId),
            Requirement::payload::<GameOverData>(inputs::DATA),
        ]
    }

    async fn handle(&self, resolved: Resolved) -> Result<(), DispatchError> {
        let connection_id = *resolved.get::<ConnectionId>(inputs::SID)?;
        let data = resolved.get::<GameOverData>(inputs::DATA)?;

        let payout = GameOverResponse::for_score(data.score);
        reply(&self.connections, connection_id, packet(ops::GAME_OVER, &payout)?)?;

        self.rooms
            .leave_current(connection_id, RoomCategory::Game, resolved.namespace())
            .await?;
        Ok(())
    }
}
