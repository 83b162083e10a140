//! In-process broadcast relay.
//!
//! Membership is indexed by the prefixed room string (`rooms:100`) so the
//! keys match what a shared pub/sub backplane would use.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use snowball_domain::{ConnectionId, RoomKey};
use snowball_shared::{CloseCode, Packet};

use crate::api::connections::{ConnectionError, ConnectionManager};
use crate::infrastructure::ports::{BroadcastRelay, RelayError, Target};

type RoomIndex = DashMap<(String, String), BTreeSet<ConnectionId>>;
type ConnectionIndex = DashMap<(String, ConnectionId), BTreeSet<String>>;

pub struct LocalBroadcastRelay {
    connections: Arc<ConnectionManager>,
    members: RoomIndex,
    rooms: ConnectionIndex,
}

impl LocalBroadcastRelay {
    pub fn new(connections: Arc<ConnectionManager>) -> Self {
        Self {
            connections,
            members: DashMap::new(),
            rooms: DashMap::new(),
        }
    }

    fn room_slot(room: &str, namespace: &str) -> (String, String) {
        (namespace.to_string(), room.to_string())
    }

    fn connection_slot(connection_id: ConnectionId, namespace: &str) -> (String, ConnectionId) {
        (namespace.to_string(), connection_id)
    }

    fn detach(&self, connection_id: ConnectionId, room: &str, namespace: &str) {
        let slot = Self::room_slot(room, namespace);
        if let Some(mut members) = self.members.get_mut(&slot) {
            members.remove(&connection_id);
        }
        self.members.remove_if(&slot, |_, members| members.is_empty());
    }

    fn deliver(&self, connection_id: ConnectionId, packet: Packet) {
        match self.connections.send(connection_id, packet) {
            Ok(()) => {}
            // Raced with a disconnect
            Err(ConnectionError::NotFound) => {
                tracing::debug!(connection_id = %connection_id, "Dropping packet for closed connection");
            }
            Err(ConnectionError::SendFailed) => {}
        }
    }
}

#[async_trait]
impl BroadcastRelay for LocalBroadcastRelay {
    async fn enter(
        &self,
        connection_id: ConnectionId,
        room: RoomKey,
        namespace: &str,
    ) -> Result<(), RelayError> {
        let room = room.to_string();
        self.members
            .entry(Self::room_slot(&room, namespace))
            .or_default()
            .insert(connection_id);
        self.rooms
            .entry(Self::connection_slot(connection_id, namespace))
            .or_default()
            .insert(room.clone());
        tracing::debug!(connection_id = %connection_id, room = %room, namespace, "Entered room");
        Ok(())
    }

    async fn leave(
        &self,
        connection_id: ConnectionId,
        room: RoomKey,
        namespace: &str,
    ) -> Result<(), RelayError> {
        let room = room.to_string();
        self.detach(connection_id, &room, namespace);

        let slot = Self::connection_slot(connection_id, namespace);
        if let Some(mut rooms) = self.rooms.get_mut(&slot) {
            rooms.remove(&room);
        }
        self.rooms.remove_if(&slot, |_, rooms| rooms.is_empty());
        tracing::debug!(connection_id = %connection_id, room = %room, namespace, "Left room");
        Ok(())
    }

    async fn members_of(
        &self,
        room: RoomKey,
        namespace: &str,
    ) -> Result<Vec<ConnectionId>, RelayError> {
        Ok(self
            .members
            .get(&Self::room_slot(&room.to_string(), namespace))
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn rooms_of(
        &self,
        connection_id: ConnectionId,
        namespace: &str,
    ) -> Result<Vec<RoomKey>, RelayError> {
        let raw: Vec<String> = self
            .rooms
            .get(&Self::connection_slot(connection_id, namespace))
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default();

        Ok(raw
            .iter()
            .filter_map(|room| match room.parse::<RoomKey>() {
                Ok(key) => Some(key),
                Err(e) => {
                    tracing::warn!(room = %room, error = %e, "Ignoring unrecognised room key");
                    None
                }
            })
            .collect())
    }

    async fn publish(
        &self,
        target: Target,
        packet: Packet,
        namespace: &str,
        skip: Option<ConnectionId>,
    ) -> Result<(), RelayError> {
        match target {
            Target::Connection(connection_id) => {
                if skip != Some(connection_id) {
                    self.deliver(connection_id, packet);
                }
            }
            Target::Room(room) => {
                let members = self.members_of(room, namespace).await?;
                for member in members.into_iter().filter(|m| Some(*m) != skip) {
                    self.deliver(member, packet.clone());
                }
            }
        }
        Ok(())
    }

    async fn disconnect(
        &self,
        connection_id: ConnectionId,
        _namespace: &str,
        code: CloseCode,
    ) -> Result<(), RelayError> {
        self.connections
            .close(connection_id, code)
            .map_err(|_| RelayError::ConnectionNotFound(connection_id))
    }

    async fn leave_all(
        &self,
        connection_id: ConnectionId,
        namespace: &str,
    ) -> Result<Vec<RoomKey>, RelayError> {
        let rooms = self
            .rooms
            .remove(&Self::connection_slot(connection_id, namespace))
            .map(|(_, rooms)| rooms)
            .unwrap_or_default();

        for room in &rooms {
            self.detach(connection_id, room, namespace);
        }

        Ok(rooms
            .iter()
            .filter_map(|room| room.parse::<RoomKey>().ok())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::connections::Outbound;
    use tokio::sync::mpsc;

    const NS: &str = "/";

    fn connected(manager: &ConnectionManager) -> (ConnectionId, mpsc::Receiver<Outbound>) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(16);
        manager.register(id, tx);
        (id, rx)
    }

    #[tokio::test]
    async fn room_publish_skips_the_excluded_member() {
        let manager = Arc::new(ConnectionManager::new());
        let relay = LocalBroadcastRelay::new(manager.clone());
        let (a, mut rx_a) = connected(&manager);
        let (b, mut rx_b) = connected(&manager);
        let room = RoomKey::room(100);
        relay.enter(a, room, NS).await.unwrap();
        relay.enter(b, room, NS).await.unwrap();

        relay
            .publish(Target::Room(room), Packet::empty("player:add"), NS, Some(a))
            .await
            .unwrap();

        assert_eq!(rx_b.recv().await, Some(Outbound::Packet(Packet::empty("player:add"))));
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn membership_is_scoped_by_namespace() {
        let manager = Arc::new(ConnectionManager::new());
        let relay = LocalBroadcastRelay::new(manager.clone());
        let (a, _rx) = connected(&manager);
        relay.enter(a, RoomKey::room(100), "/").await.unwrap();

        assert_eq!(relay.members_of(RoomKey::room(100), "/").await.unwrap(), vec![a]);
        assert!(relay.members_of(RoomKey::room(100), "/other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn leave_drops_empty_rooms() {
        let manager = Arc::new(ConnectionManager::new());
        let relay = LocalBroadcastRelay::new(manager.clone());
        let (a, _rx) = connected(&manager);
        relay.enter(a, RoomKey::room(100), NS).await.unwrap();
        relay.leave(a, RoomKey::room(100), NS).await.unwrap();

        assert!(relay.members.is_empty());
        assert!(relay.rooms.is_empty());
    }

    #[tokio::test]
    async fn leave_all_reports_every_room() {
        let manager = Arc::new(ConnectionManager::new());
        let relay = LocalBroadcastRelay::new(manager.clone());
        let (a, _rx) = connected(&manager);
        relay.enter(a, RoomKey::room(100), NS).await.unwrap();
        relay.enter(a, RoomKey::game(7), NS).await.unwrap();

        let mut left = relay.leave_all(a, NS).await.unwrap();
        left.sort();
        assert_eq!(left, vec![RoomKey::room(100), RoomKey::game(7)]);
        assert!(relay.rooms_of(a, NS).await.unwrap().is_empty());
        assert!(relay.members_of(RoomKey::room(100), NS).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn disconnect_queues_close_frame() {
        let manager = Arc::new(ConnectionManager::new());
        let relay = LocalBroadcastRelay::new(manager.clone());
        let (a, mut rx) = connected(&manager);

        relay.disconnect(a, NS, CloseCode::InvalidData).await.unwrap();
        assert_eq!(rx.recv().await, Some(Outbound::Close(CloseCode::InvalidData)));
    }

    #[tokio::test]
    async fn publishing_to_departed_member_is_not_an_error() {
        let manager = Arc::new(ConnectionManager::new());
        let relay = LocalBroadcastRelay::new(manager.clone());
        let (a, _rx) = connected(&manager);
        relay.enter(a, RoomKey::room(1), NS).await.unwrap();
        manager.unregister(a);

        relay
            .publish(Target::Room(RoomKey::room(1)), Packet::empty("x"), NS, None)
            .await
            .unwrap();
    }
}
