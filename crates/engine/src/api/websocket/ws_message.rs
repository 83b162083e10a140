//! `message:create`

use std::sync::Arc;

use async_trait::async_trait;

use snowball_domain::{RoomCategory, RoomKey, UserId};
use snowball_shared::{ops, MessageCreateData, MessageCreateResponse};

use super::ws_core::{inputs, packet};
use crate::dispatch::{ContextToken, DispatchError, PacketHandler, Requirement, Resolved};
use crate::infrastructure::ports::{BroadcastRelay, Target};
use crate::use_cases::rooms::RoomService;

pub(super) struct MessageCreateHandler {
    relay: Arc<dyn BroadcastRelay>,
    rooms: Arc<RoomService>,
}

impl MessageCreateHandler {
    pub(super) fn new(relay: Arc<dyn BroadcastRelay>, rooms: Arc<RoomService>) -> Self {
        Self { relay, rooms }
    }
}

#[async_trait]
impl PacketHandler for MessageCreateHandler {
    fn requirements(&self) -> Vec<Requirement> {
        vec![
            Requirement::context(inputs::USER_ID, ContextToken::UserId),
            Requirement::dependency(inputs::ROOM, self.rooms.requires(RoomCategory::Room)),
            Requirement::payload::<MessageCreateData>(inputs::DATA),
        ]
    }

    async fn handle(&self, resolved: Resolved) -> Result<(), DispatchError> {
        let user_id = *resolved.get::<UserId>(inputs::USER_ID)?;
        let room = *resolved.get::<RoomKey>(inputs::ROOM)?;
        let data = resolved.get::<MessageCreateData>(inputs::DATA)?;

        let message = MessageCreateResponse::from_request(user_id, MessageCreateData::clone(&data));
        self.relay
            .publish(
                Target::Room(room),
                packet(ops::MESSAGE_CREATE, &message)?,
                resolved.namespace(),
                None,
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::dispatch::DispatchOutcome;
    use crate::test_fixtures::TestWorld;
    use serde_json::json;
    use snowball_domain::RoomKey;
    use snowball_shared::{ops, CloseCode, Packet};

    #[tokio::test]
    async fn text_message_reaches_everyone_in_room() {
        let world = TestWorld::new().await;
        let mut speaker = world.connect(1).await;
        let mut listener = world.connect(2).await;
        let mut elsewhere = world.connect(3).await;
        world.join(&speaker, RoomKey::room(100)).await;
        world.join(&listener, RoomKey::room(100)).await;
        world.join(&elsewhere, RoomKey::room(200)).await;
        speaker.drain();
        listener.drain();
        elsewhere.drain();

        world
            .send(
                &speaker,
                Packet::raw(ops::MESSAGE_CREATE, json!({"type": "TEXT", "message": "hello"})),
            )
            .await;

        let heard = listener.expect(ops::MESSAGE_CREATE);
        assert_eq!(heard.d["type"], "TEXT");
        assert_eq!(heard.d["message"], "hello");
        assert_eq!(heard.d["player_id"], 1);
        assert_eq!(heard.d["banned"], false);
        speaker.expect(ops::MESSAGE_CREATE);
        assert!(elsewhere.ops().is_empty());
    }

    #[tokio::test]
    async fn emoji_message_carries_only_its_field() {
        let world = TestWorld::new().await;
        let mut speaker = world.connect(1).await;
        world.join(&speaker, RoomKey::room(100)).await;
        speaker.drain();

        world
            .send(
                &speaker,
                Packet::raw(ops::MESSAGE_CREATE, json!({"type": "EMOJI", "emoji": 4})),
            )
            .await;

        let sent = speaker.expect(ops::MESSAGE_CREATE);
        assert_eq!(sent.d["emoji"], 4);
        assert!(sent.d.get("message").is_none());
    }

    #[tokio::test]
    async fn unknown_message_type_disconnects() {
        let world = TestWorld::new().await;
        let mut speaker = world.connect(1).await;
        world.join(&speaker, RoomKey::room(100)).await;

        let outcome = world
            .send(&speaker, Packet::raw(ops::MESSAGE_CREATE, json!({"type": "SHOUT"})))
            .await;
        assert_eq!(outcome, DispatchOutcome::Disconnected(CloseCode::InvalidData));
        assert!(speaker.closed_with(CloseCode::InvalidData));
    }
}
