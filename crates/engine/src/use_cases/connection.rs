//! Connection lifecycle hooks invoked by the transport.
//!
//! `on_connect` authenticates and creates the session, `on_message` hands
//! packets to the dispatcher, `on_disconnect` announces departures and
//! discards everything the connection owned.

use std::sync::Arc;

use snowball_domain::{ConnectionId, Session, UserId};
use snowball_shared::{AuthData, Packet};

use crate::dispatch::{AuthError, DispatchError, DispatchOutcome, Dispatcher};
use crate::events::{EventBus, LocalEvent};
use crate::infrastructure::ports::{BroadcastRelay, SessionStore, TokenVerifier};

pub struct ConnectionLifecycle {
    tokens: Arc<dyn TokenVerifier>,
    sessions: Arc<dyn SessionStore>,
    relay: Arc<dyn BroadcastRelay>,
    dispatcher: Arc<Dispatcher>,
    events: Arc<EventBus>,
}

impl ConnectionLifecycle {
    pub fn new(
        tokens: Arc<dyn TokenVerifier>,
        sessions: Arc<dyn SessionStore>,
        relay: Arc<dyn BroadcastRelay>,
        dispatcher: Arc<Dispatcher>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            tokens,
            sessions,
            relay,
            dispatcher,
            events,
        }
    }

    /// Authenticate a new connection. On success the session exists and the
    /// caller should acknowledge; on failure it should close with the
    /// error's code.
    pub async fn on_connect(
        &self,
        connection_id: ConnectionId,
        auth: AuthData,
        namespace: &str,
    ) -> Result<UserId, DispatchError> {
        self.events
            .emit(LocalEvent::UserConnect { connection_id })
            .await;

        let token = auth
            .token
            .filter(|token| !token.trim().is_empty())
            .ok_or(AuthError::Missing)?;
        let user_id = self.tokens.verify(&token).map_err(AuthError::from)?;

        self.sessions
            .save(connection_id, namespace, Session::authenticated(user_id))
            .await?;

        self.events
            .emit(LocalEvent::UserAuth {
                connection_id,
                user_id,
            })
            .await;
        Ok(user_id)
    }

    pub async fn on_message(
        &self,
        connection_id: ConnectionId,
        packet: Packet,
        namespace: &str,
    ) -> DispatchOutcome {
        self.dispatcher.dispatch(connection_id, packet, namespace).await
    }

    /// A frame that never made it to a packet.
    pub async fn on_malformed(
        &self,
        connection_id: ConnectionId,
        reason: impl Into<String>,
        namespace: &str,
    ) -> DispatchOutcome {
        self.dispatcher
            .report(
                connection_id,
                namespace,
                "<malformed>",
                DispatchError::Protocol(reason.into()),
            )
            .await
    }

    /// Tear down everything the connection owned. Remaining room members are
    /// told before the session is discarded.
    pub async fn on_disconnect(&self, connection_id: ConnectionId, namespace: &str) {
        // 1. Capture what is about to be discarded
        let session = match self.sessions.get(connection_id, namespace).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(connection_id = %connection_id, error = %e, "Failed to read session on disconnect");
                None
            }
        };
        let rooms = match self.relay.rooms_of(connection_id, namespace).await {
            Ok(rooms) => rooms,
            Err(e) => {
                tracing::warn!(connection_id = %connection_id, error = %e, "Failed to read rooms on disconnect");
                Vec::new()
            }
        };

        // 2. Remove notices go out while the connection is still a member,
        //    skipped as a recipient
        self.events
            .emit(LocalEvent::UserDisconnect {
                connection_id,
                namespace: namespace.to_string(),
                session,
                rooms,
            })
            .await;

        // 3. Drop membership and session
        if let Err(e) = self.relay.leave_all(connection_id, namespace).await {
            tracing::warn!(connection_id = %connection_id, error = %e, "Failed to drop room membership");
        }
        if let Err(e) = self.sessions.remove(connection_id, namespace).await {
            tracing::warn!(connection_id = %connection_id, error = %e, "Failed to discard session");
        }

        tracing::debug!(connection_id = %connection_id, namespace, "Connection cleaned up");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{PacketRegistry, Services};
    use crate::infrastructure::accounts::InMemoryAccountRepo;
    use crate::infrastructure::ports::{MockTokenVerifier, TokenError};
    use crate::infrastructure::relay::LocalBroadcastRelay;
    use crate::stores::InMemorySessionStore;
    use crate::api::connections::ConnectionManager;
    use crate::test_fixtures::{TestWorld, NS};
    use snowball_domain::RoomKey;
    use snowball_shared::{ops, CloseCode};

    fn lifecycle(tokens: MockTokenVerifier) -> (ConnectionLifecycle, Arc<InMemorySessionStore>) {
        let connections = Arc::new(ConnectionManager::new());
        let relay = Arc::new(LocalBroadcastRelay::new(connections));
        let sessions = Arc::new(InMemorySessionStore::new());
        let services = Services {
            sessions: sessions.clone(),
            accounts: Arc::new(InMemoryAccountRepo::new()),
        };
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(PacketRegistry::new()),
            services,
            relay.clone(),
        ));
        (
            ConnectionLifecycle::new(
                Arc::new(tokens),
                sessions.clone(),
                relay,
                dispatcher,
                Arc::new(EventBus::new()),
            ),
            sessions,
        )
    }

    fn auth(token: Option<&str>) -> AuthData {
        AuthData {
            token: token.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn valid_token_creates_session() {
        let mut tokens = MockTokenVerifier::new();
        tokens
            .expect_verify()
            .withf(|token| token == "good")
            .returning(|_| Ok(UserId::new(42)));
        let (lifecycle, sessions) = lifecycle(tokens);
        let connection_id = ConnectionId::new();

        let user_id = lifecycle
            .on_connect(connection_id, auth(Some("good")), NS)
            .await
            .unwrap();
        assert_eq!(user_id, UserId::new(42));

        let session = sessions.get(connection_id, NS).await.unwrap().unwrap();
        assert_eq!(session.user_id, Some(UserId::new(42)));
        assert_eq!(session.room_id, None);
    }

    #[tokio::test]
    async fn missing_or_blank_token_is_rejected_without_verifying() {
        let mut tokens = MockTokenVerifier::new();
        tokens.expect_verify().never();
        let (lifecycle, sessions) = lifecycle(tokens);

        for data in [auth(None), auth(Some("  "))] {
            let connection_id = ConnectionId::new();
            let err = lifecycle.on_connect(connection_id, data, NS).await.unwrap_err();
            assert_eq!(err, DispatchError::Auth(AuthError::Missing));
            assert!(sessions.get(connection_id, NS).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn token_failures_map_to_close_codes() {
        let mut tokens = MockTokenVerifier::new();
        tokens
            .expect_verify()
            .withf(|token| token == "old")
            .returning(|_| Err(TokenError::Expired));
        tokens
            .expect_verify()
            .withf(|token| token == "forged")
            .returning(|_| Err(TokenError::Invalid("bad signature".into())));
        let (lifecycle, _) = lifecycle(tokens);

        let expired = lifecycle
            .on_connect(ConnectionId::new(), auth(Some("old")), NS)
            .await
            .unwrap_err();
        let forged = lifecycle
            .on_connect(ConnectionId::new(), auth(Some("forged")), NS)
            .await
            .unwrap_err();

        match (expired, forged) {
            (DispatchError::Auth(expired), DispatchError::Auth(forged)) => {
                assert_eq!(expired.close_code(), CloseCode::TokenExpired);
                assert_eq!(forged.close_code(), CloseCode::AuthenticationFailed);
            }
            other => panic!("expected auth errors, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn disconnect_notifies_roommates_once_and_discards_state() {
        let world = TestWorld::new().await;
        let leaver = world.connect(1).await;
        let mut stayer = world.connect(2).await;
        world.join(&leaver, RoomKey::room(100)).await;
        world.join(&stayer, RoomKey::room(100)).await;
        stayer.drain();

        world.app.lifecycle.on_disconnect(leaver.connection_id, NS).await;

        assert_eq!(stayer.ops(), vec![ops::PLAYER_REMOVE]);
        assert!(world.rooms_of(&leaver).await.is_empty());
        assert_eq!(world.members(RoomKey::room(100)).await, vec![stayer.connection_id]);
        assert!(world
            .sessions
            .get(leaver.connection_id, NS)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn malformed_frame_closes_with_invalid_data() {
        let world = TestWorld::new().await;
        let mut client = world.connect(1).await;

        let outcome = world
            .app
            .lifecycle
            .on_malformed(client.connection_id, "not json", NS)
            .await;
        assert_eq!(outcome, DispatchOutcome::Disconnected(CloseCode::InvalidData));
        assert!(client.closed_with(CloseCode::InvalidData));
    }
}
