//! Shared test helpers: a fully wired engine plus scripted clients.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_fixtures::{TestWorld, NS};
//!
//! #[tokio::test]
//! async fn joins_a_room() {
//!     let world = TestWorld::new().await;
//!     let mut client = world.connect(1).await;
//!     world.join(&client, RoomKey::room(100)).await;
//!     client.expect(ops::ROOM_JOIN);
//! }
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::mpsc;

use snowball_domain::{ConnectionId, RoomKey, Session, UserId, UserRecord};
use snowball_shared::{AuthData, CloseCode, Packet};

use crate::api::connections::Outbound;
use crate::app::App;
use crate::dispatch::DispatchOutcome;
use crate::infrastructure::accounts::InMemoryAccountRepo;
use crate::infrastructure::auth::JwtTokenVerifier;
use crate::infrastructure::clock::FixedRandom;
use crate::infrastructure::ports::{BroadcastRelay, SessionStore};
use crate::infrastructure::settings::EngineConfig;
use crate::use_cases::rooms::RoomService;

/// Namespace every fixture connection lives in.
pub const NS: &str = "/";

pub const TEST_SECRET: &str = "test-secret";

const CLIENT_BUFFER: usize = 256;

pub fn test_config() -> EngineConfig {
    EngineConfig {
        secret_key: TEST_SECRET.into(),
        namespace: NS.into(),
        ..EngineConfig::default()
    }
}

/// An engine with in-memory adapters and deterministic spawn placement.
pub struct TestWorld {
    pub app: Arc<App>,
    pub rooms: Arc<RoomService>,
    pub sessions: Arc<dyn SessionStore>,
    pub relay: Arc<dyn BroadcastRelay>,
    pub accounts: Arc<InMemoryAccountRepo>,
    pub tokens: Arc<JwtTokenVerifier>,
}

impl TestWorld {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: EngineConfig) -> Self {
        let accounts = Arc::new(InMemoryAccountRepo::new());
        let tokens = Arc::new(JwtTokenVerifier::new(&config.secret_key));
        let app = Arc::new(
            App::new(
                config,
                accounts.clone(),
                tokens.clone(),
                Arc::new(FixedRandom),
            )
            .await,
        );
        Self {
            rooms: app.rooms.clone(),
            sessions: app.sessions.clone(),
            relay: app.relay.clone(),
            app,
            accounts,
            tokens,
        }
    }

    /// Signed token for `user_id`, valid for an hour.
    pub fn token_for(&self, user_id: i64) -> String {
        let expires_at = chrono::Utc::now().timestamp() + 3600;
        self.tokens
            .issue(UserId::new(user_id), expires_at)
            .expect("token should sign")
    }

    /// Register a connection for `user_id` and authenticate it.
    pub async fn connect(&self, user_id: i64) -> TestClient {
        let connection_id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);
        self.app.connections.register(connection_id, tx);
        self.accounts
            .insert(UserRecord::new(UserId::new(user_id), format!("p{user_id}")));

        let auth = AuthData {
            token: Some(self.token_for(user_id)),
        };
        let authenticated = self
            .app
            .lifecycle
            .on_connect(connection_id, auth, NS)
            .await
            .expect("fixture connection should authenticate");

        TestClient {
            connection_id,
            user_id: authenticated,
            rx,
            pending: VecDeque::new(),
        }
    }

    /// Place the client in `room` at a fixed position.
    pub async fn join(&self, client: &TestClient, room: RoomKey) {
        self.rooms
            .join_room(client.connection_id, room, 500.0, 700.0, NS)
            .await
            .expect("fixture join should succeed");
    }

    pub async fn send(&self, client: &TestClient, packet: Packet) -> DispatchOutcome {
        self.app
            .lifecycle
            .on_message(client.connection_id, packet, NS)
            .await
    }

    pub async fn session(&self, client: &TestClient) -> Session {
        self.sessions
            .get(client.connection_id, NS)
            .await
            .expect("session store should answer")
            .expect("client should have a session")
    }

    /// Current rooms of the client, sorted.
    pub async fn rooms_of(&self, client: &TestClient) -> Vec<RoomKey> {
        let mut rooms = self
            .relay
            .rooms_of(client.connection_id, NS)
            .await
            .expect("relay should answer");
        rooms.sort();
        rooms
    }

    pub async fn members(&self, room: RoomKey) -> Vec<ConnectionId> {
        self.relay
            .members_of(room, NS)
            .await
            .expect("relay should answer")
    }
}

/// The receiving end of one fixture connection.
pub struct TestClient {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    rx: mpsc::Receiver<Outbound>,
    pending: VecDeque<Outbound>,
}

impl TestClient {
    fn pull(&mut self) {
        while let Ok(item) = self.rx.try_recv() {
            self.pending.push_back(item);
        }
    }

    /// Everything delivered so far, oldest first.
    pub fn drain(&mut self) -> Vec<Outbound> {
        self.pull();
        self.pending.drain(..).collect()
    }

    /// Ops of every packet delivered so far, consuming them.
    pub fn ops(&mut self) -> Vec<String> {
        self.drain()
            .into_iter()
            .filter_map(|item| match item {
                Outbound::Packet(packet) => Some(packet.op),
                Outbound::Close(_) => None,
            })
            .collect()
    }

    /// Remove and return the first delivered packet with `op`.
    pub fn expect(&mut self, op: &str) -> Packet {
        self.pull();
        let position = self
            .pending
            .iter()
            .position(|item| matches!(item, Outbound::Packet(p) if p.op == op));
        match position.and_then(|i| self.pending.remove(i)) {
            Some(Outbound::Packet(packet)) => packet,
            _ => panic!("expected a {op} packet, got {:?}", self.pending),
        }
    }

    pub fn closed_with(&mut self, code: CloseCode) -> bool {
        self.pull();
        self.pending
            .iter()
            .any(|item| matches!(item, Outbound::Close(c) if *c == code))
    }
}
