//! `waddle:join` / `waddle:leave`

use std::sync::Arc;

use async_trait::async_trait;

use snowball_domain::{RoomCategory, RoomKey, UserRecord};
use snowball_shared::{WaddleData, WaddleResponse};

use super::ws_core::{inputs, packet};
use crate::dispatch::{ContextToken, DispatchError, PacketHandler, Requirement, Resolved};
use crate::infrastructure::ports::{BroadcastRelay, Target};
use crate::use_cases::rooms::RoomService;

/// Announces a player taking or leaving a waddle seat. Requires a verified
/// account, not just a session.
pub(super) struct WaddleHandler {
    op: &'static str,
    relay: Arc<dyn BroadcastRelay>,
    rooms: Arc<RoomService>,
}

impl WaddleHandler {
    pub(super) fn new(op: &'static str, relay: Arc<dyn BroadcastRelay>, rooms: Arc<RoomService>) -> Self {
        Self { op, relay, rooms }
    }
}

#[async_trait]
impl PacketHandler for WaddleHandler {
    fn requirements(&self) -> Vec<Requirement> {
        vec![
            Requirement::context(inputs::IDENTITY, ContextToken::Identity),
            Requirement::dependency(inputs::ROOM, self.rooms.requires(RoomCategory::Room)),
            Requirement::payload::<WaddleData>(inputs::DATA),
        ]
    }

    async fn handle(&self, resolved: Resolved) -> Result<(), DispatchError> {
        let user = resolved.get::<UserRecord>(inputs::IDENTITY)?;
        let room = *resolved.get::<RoomKey>(inputs::ROOM)?;
        let data = resolved.get::<WaddleData>(inputs::DATA)?;

        let response = WaddleResponse {
            waddle_id: data.waddle_id,
            player: user.id,
        };
        self.relay
            .publish(
                Target::Room(room),
                packet(self.op, &response)?,
                resolved.namespace(),
                None,
            )
            .await?;
        Ok(())
    }
}
