//! Room state machine.
//!
//! Per connection and per room category: `Unplaced -> InRoom(key)`, switch
//! `InRoom(a) -> InRoom(b)` as leave-then-join, and back to `Unplaced` on
//! leave. The broadcast relay holds membership; the session keeps position,
//! action and a cached room id. Reactive side effects (presence snapshots,
//! add/remove notices) hang off the events raised here.

pub mod presence;
pub mod spawn;

use std::sync::Arc;

use snowball_domain::{ConnectionId, RoomCategory, RoomKey, Session};

use crate::dispatch::{DispatchError, Dependency, Resolved};
use crate::events::{EventBus, LocalEvent};
use crate::infrastructure::ports::{BroadcastRelay, SessionStore};

pub use presence::{AuditReactor, PresenceReactor};
pub use spawn::SpawnPolicy;

pub struct RoomService {
    sessions: Arc<dyn SessionStore>,
    relay: Arc<dyn BroadcastRelay>,
    events: Arc<EventBus>,
    in_room: Dependency,
    in_game: Dependency,
}

impl RoomService {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        relay: Arc<dyn BroadcastRelay>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            in_room: current_room_dependency(relay.clone(), RoomCategory::Room),
            in_game: current_room_dependency(relay.clone(), RoomCategory::Game),
            sessions,
            relay,
            events,
        }
    }

    /// Dependency yielding the caller's current room of `category`, failing
    /// with that category's absent error when there is none.
    pub fn requires(&self, category: RoomCategory) -> &Dependency {
        match category {
            RoomCategory::Room => &self.in_room,
            RoomCategory::Game => &self.in_game,
        }
    }

    pub async fn current_room(
        &self,
        connection_id: ConnectionId,
        category: RoomCategory,
        namespace: &str,
    ) -> Result<RoomKey, DispatchError> {
        find_room(self.relay.as_ref(), connection_id, category, namespace).await
    }

    /// Place the connection in `room`, leaving its current room of the same
    /// category first.
    pub async fn join_room(
        &self,
        connection_id: ConnectionId,
        room: RoomKey,
        x: f64,
        y: f64,
        namespace: &str,
    ) -> Result<(), DispatchError> {
        // 1. Leave the previous room of this kind, if any
        self.leave_current(connection_id, room.category(), namespace)
            .await?;

        // 2. Commit position and room to the session
        self.sessions
            .mutate(
                connection_id,
                namespace,
                Box::new(move |session: &mut Session| session.place(room, x, y)),
            )
            .await?;

        // 3. Register membership
        self.relay.enter(connection_id, room, namespace).await?;

        tracing::info!(
            connection_id = %connection_id,
            room = %room,
            namespace,
            "Joined room"
        );

        // 4. Presence snapshot and add notices
        self.events
            .emit(LocalEvent::RoomJoin {
                connection_id,
                room,
                namespace: namespace.to_string(),
            })
            .await;
        Ok(())
    }

    pub async fn leave_room(
        &self,
        connection_id: ConnectionId,
        room: RoomKey,
        namespace: &str,
    ) -> Result<(), DispatchError> {
        self.relay.leave(connection_id, room, namespace).await?;
        self.sessions
            .mutate(
                connection_id,
                namespace,
                Box::new(move |session: &mut Session| session.vacate(room)),
            )
            .await?;

        tracing::info!(
            connection_id = %connection_id,
            room = %room,
            namespace,
            "Left room"
        );

        self.events
            .emit(LocalEvent::RoomLeave {
                connection_id,
                room,
                namespace: namespace.to_string(),
            })
            .await;
        Ok(())
    }

    /// Leave whatever room of `category` the connection is in. Not being in
    /// one is fine.
    pub async fn leave_current(
        &self,
        connection_id: ConnectionId,
        category: RoomCategory,
        namespace: &str,
    ) -> Result<Option<RoomKey>, DispatchError> {
        match self.current_room(connection_id, category, namespace).await {
            Ok(room) => {
                self.leave_room(connection_id, room, namespace).await?;
                Ok(Some(room))
            }
            Err(e) if e.is_absent_room() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

async fn find_room(
    relay: &dyn BroadcastRelay,
    connection_id: ConnectionId,
    category: RoomCategory,
    namespace: &str,
) -> Result<RoomKey, DispatchError> {
    relay
        .rooms_of(connection_id, namespace)
        .await?
        .into_iter()
        .find(|room| room.is(category))
        .ok_or_else(|| category.absent_error().into())
}

fn current_room_dependency(relay: Arc<dyn BroadcastRelay>, category: RoomCategory) -> Dependency {
    let name = match category {
        RoomCategory::Room => "current_room",
        RoomCategory::Game => "current_game",
    };
    Dependency::future(name, vec![], move |inputs: Resolved| {
        let relay = relay.clone();
        async move {
            find_room(
                relay.as_ref(),
                inputs.connection_id(),
                category,
                inputs.namespace(),
            )
            .await
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{TestWorld, NS};
    use snowball_domain::DomainError;
    use snowball_shared::ops;

    #[tokio::test]
    async fn join_places_session_and_membership() {
        let world = TestWorld::new().await;
        let client = world.connect(1).await;

        world
            .rooms
            .join_room(client.connection_id, RoomKey::room(100), 500.0, 700.0, NS)
            .await
            .unwrap();

        let session = world.session(&client).await;
        assert_eq!(session.room_id, Some(100));
        assert_eq!((session.x, session.y), (500.0, 700.0));
        assert_eq!(
            world
                .rooms
                .current_room(client.connection_id, RoomCategory::Room, NS)
                .await
                .unwrap(),
            RoomKey::room(100)
        );
    }

    #[tokio::test]
    async fn switching_rooms_keeps_one_membership_per_kind() {
        let world = TestWorld::new().await;
        let client = world.connect(1).await;

        for room in [100, 200, 300] {
            world
                .rooms
                .join_room(client.connection_id, RoomKey::room(room), 1.0, 1.0, NS)
                .await
                .unwrap();
        }
        world
            .rooms
            .join_room(client.connection_id, RoomKey::game(7), 0.0, 0.0, NS)
            .await
            .unwrap();

        let mut rooms = world.rooms_of(&client).await;
        rooms.sort();
        assert_eq!(rooms, vec![RoomKey::room(300), RoomKey::game(7)]);
        assert!(world.members(RoomKey::room(100)).await.is_empty());
        assert_eq!(world.session(&client).await.room_id, Some(300));
    }

    #[tokio::test]
    async fn rejoining_same_room_is_not_stacked() {
        let world = TestWorld::new().await;
        let client = world.connect(1).await;

        for _ in 0..2 {
            world
                .rooms
                .join_room(client.connection_id, RoomKey::room(100), 1.0, 1.0, NS)
                .await
                .unwrap();
        }

        assert_eq!(world.members(RoomKey::room(100)).await, vec![client.connection_id]);
        assert_eq!(world.rooms_of(&client).await, vec![RoomKey::room(100)]);
    }

    #[tokio::test]
    async fn switch_sends_remove_to_old_room_then_add_to_new() {
        let world = TestWorld::new().await;
        let mover = world.connect(1).await;
        let mut in_a = world.connect(2).await;
        let mut in_b = world.connect(3).await;

        world.join(&in_a, RoomKey::room(100)).await;
        world.join(&in_b, RoomKey::room(200)).await;
        world.join(&mover, RoomKey::room(100)).await;
        in_a.drain();
        in_b.drain();

        world.join(&mover, RoomKey::room(200)).await;

        assert_eq!(in_a.ops(), vec![ops::PLAYER_REMOVE]);
        assert_eq!(in_b.ops(), vec![ops::PLAYER_ADD]);
    }

    #[tokio::test]
    async fn absent_room_uses_category_error() {
        let world = TestWorld::new().await;
        let client = world.connect(1).await;

        let err = world
            .rooms
            .current_room(client.connection_id, RoomCategory::Room, NS)
            .await
            .unwrap_err();
        assert_eq!(err, DispatchError::Domain(DomainError::NotInRoom));

        let err = world
            .rooms
            .current_room(client.connection_id, RoomCategory::Game, NS)
            .await
            .unwrap_err();
        assert_eq!(err, DispatchError::Domain(DomainError::GameNotFound));
    }

    #[tokio::test]
    async fn leave_current_tolerates_unplaced_connection() {
        let world = TestWorld::new().await;
        let client = world.connect(1).await;

        let left = world
            .rooms
            .leave_current(client.connection_id, RoomCategory::Room, NS)
            .await
            .unwrap();
        assert_eq!(left, None);

        world.join(&client, RoomKey::room(100)).await;
        let left = world
            .rooms
            .leave_current(client.connection_id, RoomCategory::Room, NS)
            .await
            .unwrap();
        assert_eq!(left, Some(RoomKey::room(100)));
        assert_eq!(world.session(&client).await.room_id, None);
    }
}
