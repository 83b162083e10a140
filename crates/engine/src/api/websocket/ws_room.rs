//! `room:join`

use std::sync::Arc;

use async_trait::async_trait;

use snowball_domain::{ConnectionId, RoomKey};
use snowball_shared::RoomJoinData;

use super::ws_core::inputs;
use crate::dispatch::{ContextToken, DispatchError, PacketHandler, Requirement, Resolved};
use crate::use_cases::rooms::{RoomService, SpawnPolicy};

/// Join a room, or a random spawn room when none is named. Missing or zero
/// coordinates are replaced with safe spawn coordinates.
pub(super) struct RoomJoinHandler {
    rooms: Arc<RoomService>,
    spawn: Arc<SpawnPolicy>,
}

impl RoomJoinHandler {
    pub(super) fn new(rooms: Arc<RoomService>, spawn: Arc<SpawnPolicy>) -> Self {
        Self { rooms, spawn }
    }
}

#[async_trait]
impl PacketHandler for RoomJoinHandler {
    fn requirements(&self) -> Vec<Requirement> {
        vec![
            Requirement::context(inputs::SID, ContextToken::ConnectionId),
            Requirement::payload::<RoomJoinData>(inputs::DATA),
        ]
    }

    async fn handle(&self, resolved: Resolved) -> Result<(), DispatchError> {
        let connection_id = *resolved.get::<ConnectionId>(inputs::SID)?;
        let data = resolved.get::<RoomJoinData>(inputs::DATA)?;

        let room_id = data.room_id.unwrap_or_else(|| self.spawn.pick_room());
        let (safe_x, safe_y) = self.spawn.safe_coordinates(room_id);
        let x = data.x.filter(|x| *x != 0.0).unwrap_or(safe_x);
        let y = data.y.filter(|y| *y != 0.0).unwrap_or(safe_y);

        self.rooms
            .join_room(connection_id, RoomKey::room(room_id), x, y, resolved.namespace())
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::test_fixtures::{TestWorld, NS};
    use crate::dispatch::DispatchOutcome;
    use serde_json::json;
    use snowball_domain::{RoomCategory, RoomKey};
    use snowball_shared::{ops, CloseCode, Packet};

    #[tokio::test]
    async fn joins_requested_room_at_requested_position() {
        let world = TestWorld::new().await;
        let mut client = world.connect(1).await;

        let outcome = world
            .send(
                &client,
                Packet::raw(ops::ROOM_JOIN, json!({"room_id": 300, "x": 520.0, "y": 690.0})),
            )
            .await;
        assert_eq!(outcome, DispatchOutcome::Completed);

        let snapshot = client.expect(ops::ROOM_JOIN);
        assert_eq!(snapshot.d["room_id"], 300);
        let session = world.session(&client).await;
        assert_eq!((session.x, session.y), (520.0, 690.0));
    }

    #[tokio::test]
    async fn empty_payload_spawns_at_safe_position() {
        let world = TestWorld::new().await;
        let client = world.connect(1).await;

        world.send(&client, Packet::raw(ops::ROOM_JOIN, json!({}))).await;

        // Fixed randomness picks the first spawn room and the rectangle's corner
        assert_eq!(world.rooms_of(&client).await, vec![RoomKey::room(100)]);
        let session = world.session(&client).await;
        assert_eq!((session.x, session.y), (473.0, 704.0));
    }

    #[tokio::test]
    async fn zero_coordinates_count_as_absent() {
        let world = TestWorld::new().await;
        let client = world.connect(1).await;

        world
            .send(
                &client,
                Packet::raw(ops::ROOM_JOIN, json!({"room_id": 200, "x": 0, "y": 715.0})),
            )
            .await;

        let session = world.session(&client).await;
        assert_eq!((session.x, session.y), (473.0, 715.0));
    }

    #[tokio::test]
    async fn switching_rooms_leaves_the_previous_one() {
        let world = TestWorld::new().await;
        let client = world.connect(1).await;

        for room_id in [100, 200] {
            world
                .send(&client, Packet::raw(ops::ROOM_JOIN, json!({"room_id": room_id})))
                .await;
        }

        assert_eq!(world.rooms_of(&client).await, vec![RoomKey::room(200)]);
        assert!(world.members(RoomKey::room(100)).await.is_empty());
        assert_eq!(
            world
                .rooms
                .current_room(client.connection_id, RoomCategory::Room, NS)
                .await
                .unwrap(),
            RoomKey::room(200)
        );
    }

    #[tokio::test]
    async fn wrongly_typed_room_id_is_invalid_data() {
        let world = TestWorld::new().await;
        let mut client = world.connect(1).await;

        let outcome = world
            .send(&client, Packet::raw(ops::ROOM_JOIN, json!({"room_id": "lobby"})))
            .await;
        assert_eq!(outcome, DispatchOutcome::Disconnected(CloseCode::InvalidData));
        assert!(client.closed_with(CloseCode::InvalidData));
        assert!(world.rooms_of(&client).await.is_empty());
    }
}
