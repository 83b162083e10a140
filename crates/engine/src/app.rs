//! Application state and composition.

use std::sync::Arc;

use crate::api::connections::ConnectionManager;
use crate::api::websocket::{register_handlers, HandlerDeps};
use crate::dispatch::{Dispatcher, PacketRegistry, Services};
use crate::events::{EventBus, EventName};
use crate::infrastructure::ports::{
    AccountRepo, BroadcastRelay, RandomPort, SessionStore, TokenVerifier,
};
use crate::infrastructure::relay::LocalBroadcastRelay;
use crate::infrastructure::settings::EngineConfig;
use crate::stores::InMemorySessionStore;
use crate::use_cases::connection::ConnectionLifecycle;
use crate::use_cases::rooms::{AuditReactor, PresenceReactor, RoomService, SpawnPolicy};

/// Main application state.
///
/// Passed to the WebSocket handler via Axum state.
pub struct App {
    pub config: EngineConfig,
    pub connections: Arc<ConnectionManager>,
    pub sessions: Arc<dyn SessionStore>,
    pub relay: Arc<dyn BroadcastRelay>,
    pub accounts: Arc<dyn AccountRepo>,
    pub events: Arc<EventBus>,
    pub registry: Arc<PacketRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    pub rooms: Arc<RoomService>,
    pub lifecycle: Arc<ConnectionLifecycle>,
}

/// The swappable edges of the engine.
///
/// `relay` and `sessions` are the shared backplane: every process serving
/// the same world must be given adapters over the same store, or room
/// membership splits between processes.
pub struct Adapters {
    pub connections: Arc<ConnectionManager>,
    pub sessions: Arc<dyn SessionStore>,
    pub relay: Arc<dyn BroadcastRelay>,
    pub accounts: Arc<dyn AccountRepo>,
    pub tokens: Arc<dyn TokenVerifier>,
    pub random: Arc<dyn RandomPort>,
}

impl Adapters {
    /// Single-process adapters: in-memory sessions and an in-process relay.
    pub fn local(
        accounts: Arc<dyn AccountRepo>,
        tokens: Arc<dyn TokenVerifier>,
        random: Arc<dyn RandomPort>,
    ) -> Self {
        let connections = Arc::new(ConnectionManager::new());
        Self {
            relay: Arc::new(LocalBroadcastRelay::new(connections.clone())),
            sessions: Arc::new(InMemorySessionStore::new()),
            connections,
            accounts,
            tokens,
            random,
        }
    }
}

impl App {
    /// Build with single-process adapters.
    pub async fn new(
        config: EngineConfig,
        accounts: Arc<dyn AccountRepo>,
        tokens: Arc<dyn TokenVerifier>,
        random: Arc<dyn RandomPort>,
    ) -> Self {
        Self::with_adapters(config, Adapters::local(accounts, tokens, random)).await
    }

    /// Wire the given adapters, subscribe the reactors and register the
    /// packet handlers.
    pub async fn with_adapters(config: EngineConfig, adapters: Adapters) -> Self {
        let Adapters {
            connections,
            sessions,
            relay,
            accounts,
            tokens,
            random,
        } = adapters;
        let events = Arc::new(EventBus::new());

        // Reactors
        let presence = Arc::new(PresenceReactor::new(
            sessions.clone(),
            accounts.clone(),
            relay.clone(),
        ));
        for event in [EventName::RoomJoin, EventName::RoomLeave, EventName::UserDisconnect] {
            events.subscribe(event, presence.clone()).await;
        }
        let audit = Arc::new(AuditReactor);
        for event in [EventName::UserConnect, EventName::UserAuth, EventName::UserDisconnect] {
            events.subscribe(event, audit.clone()).await;
        }

        // Dispatch
        let registry = Arc::new(PacketRegistry::new());
        let dispatcher = Arc::new(Dispatcher::new(
            registry.clone(),
            Services {
                sessions: sessions.clone(),
                accounts: accounts.clone(),
            },
            relay.clone(),
        ));
        let rooms = Arc::new(RoomService::new(
            sessions.clone(),
            relay.clone(),
            events.clone(),
        ));

        let deps = HandlerDeps {
            connections: connections.clone(),
            sessions: sessions.clone(),
            relay: relay.clone(),
            rooms: rooms.clone(),
            spawn: Arc::new(SpawnPolicy::new(random)),
        };
        register_handlers(&registry, &config.namespace, &deps).await;

        let lifecycle = Arc::new(ConnectionLifecycle::new(
            tokens,
            sessions.clone(),
            relay.clone(),
            dispatcher.clone(),
            events.clone(),
        ));

        Self {
            config,
            connections,
            sessions,
            relay,
            accounts,
            events,
            registry,
            dispatcher,
            rooms,
            lifecycle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::accounts::InMemoryAccountRepo;
    use crate::infrastructure::auth::JwtTokenVerifier;
    use crate::infrastructure::clock::FixedRandom;
    use crate::test_fixtures::{test_config, NS, TEST_SECRET};
    use snowball_domain::{ConnectionId, RoomKey, UserId, UserRecord};
    use snowball_shared::AuthData;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn injected_backplane_carries_sessions_and_membership() {
        let accounts = Arc::new(InMemoryAccountRepo::with_users([UserRecord::new(
            UserId::new(1),
            "p1",
        )]));
        let tokens = Arc::new(JwtTokenVerifier::new(TEST_SECRET));
        let token = tokens
            .issue(UserId::new(1), chrono::Utc::now().timestamp() + 3600)
            .unwrap();

        // Stands in for a store shared with other processes
        let connections = Arc::new(ConnectionManager::new());
        let shared_sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let shared_relay: Arc<dyn BroadcastRelay> =
            Arc::new(LocalBroadcastRelay::new(connections.clone()));

        let app = App::with_adapters(
            test_config(),
            Adapters {
                connections: connections.clone(),
                sessions: shared_sessions.clone(),
                relay: shared_relay.clone(),
                accounts,
                tokens,
                random: Arc::new(FixedRandom),
            },
        )
        .await;

        let connection_id = ConnectionId::new();
        let (tx, _rx) = mpsc::channel(16);
        app.connections.register(connection_id, tx);
        app.lifecycle
            .on_connect(connection_id, AuthData { token: Some(token) }, NS)
            .await
            .unwrap();
        app.rooms
            .join_room(connection_id, RoomKey::room(100), 500.0, 700.0, NS)
            .await
            .unwrap();

        let session = shared_sessions.get(connection_id, NS).await.unwrap().unwrap();
        assert_eq!(session.user_id, Some(UserId::new(1)));
        assert_eq!(
            shared_relay.members_of(RoomKey::room(100), NS).await.unwrap(),
            vec![connection_id]
        );
        assert!(connections.is_connected(connection_id));
    }
}
