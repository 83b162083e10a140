//! Handler registration and helpers shared by the packet handlers.

use std::sync::Arc;

use serde::Serialize;

use snowball_domain::ConnectionId;
use snowball_shared::{ops, Packet};

use super::connection_error;
use super::ws_game::{GameJoinHandler, GameOverHandler, GameStartHandler};
use super::ws_message::MessageCreateHandler;
use super::ws_player::{PingHandler, PlayerActionHandler};
use super::ws_room::RoomJoinHandler;
use super::ws_waddle::WaddleHandler;
use crate::api::connections::ConnectionManager;
use crate::dispatch::{ContextToken, DispatchError, Handler, PacketRegistry, Requirement};
use crate::infrastructure::ports::{BroadcastRelay, SessionStore};
use crate::use_cases::rooms::{RoomService, SpawnPolicy};

/// Input names used across handlers.
pub(super) mod inputs {
    pub const SID: &str = "sid";
    pub const NAMESPACE: &str = "namespace";
    pub const USER_ID: &str = "user_id";
    pub const IDENTITY: &str = "user";
    pub const SESSION: &str = "session";
    pub const ROOM: &str = "room";
    pub const DATA: &str = "data";
}

/// What the packet handlers are built from.
#[derive(Clone)]
pub struct HandlerDeps {
    pub connections: Arc<ConnectionManager>,
    pub sessions: Arc<dyn SessionStore>,
    pub relay: Arc<dyn BroadcastRelay>,
    pub rooms: Arc<RoomService>,
    pub spawn: Arc<SpawnPolicy>,
}

/// Register every game packet handler in `namespace`.
///
/// Each registration carries an authentication guard ahead of the
/// handler's own inputs.
pub async fn register_handlers(registry: &PacketRegistry, namespace: &str, deps: &HandlerDeps) {
    let handlers = [
        (
            ops::ROOM_JOIN,
            Handler::asynchronous(RoomJoinHandler::new(deps.rooms.clone(), deps.spawn.clone())),
        ),
        (
            ops::PLAYER_ACTION,
            Handler::asynchronous(PlayerActionHandler::new(
                deps.sessions.clone(),
                deps.relay.clone(),
                deps.rooms.clone(),
            )),
        ),
        (
            ops::PLAYER_PING,
            Handler::blocking(PingHandler::new(deps.connections.clone())),
        ),
        (
            ops::MESSAGE_CREATE,
            Handler::asynchronous(MessageCreateHandler::new(
                deps.relay.clone(),
                deps.rooms.clone(),
            )),
        ),
        (
            ops::WADDLE_JOIN,
            Handler::asynchronous(WaddleHandler::new(
                ops::WADDLE_JOIN,
                deps.relay.clone(),
                deps.rooms.clone(),
            )),
        ),
        (
            ops::WADDLE_LEAVE,
            Handler::asynchronous(WaddleHandler::new(
                ops::WADDLE_LEAVE,
                deps.relay.clone(),
                deps.rooms.clone(),
            )),
        ),
        (
            ops::GAME_JOIN,
            Handler::asynchronous(GameJoinHandler::new(deps.rooms.clone())),
        ),
        (
            ops::GAME_START,
            Handler::blocking(GameStartHandler::new(deps.connections.clone())),
        ),
        (
            ops::GAME_OVER,
            Handler::asynchronous(GameOverHandler::new(
                deps.connections.clone(),
                deps.rooms.clone(),
            )),
        ),
    ];

    for (op, handler) in handlers {
        registry
            .register(namespace, op, handler, vec![authenticated()])
            .await;
    }

    tracing::info!(
        namespace,
        ops = ?registry.ops(namespace).await,
        "Packet handlers registered"
    );
}

fn authenticated() -> Requirement {
    Requirement::context(inputs::USER_ID, ContextToken::UserId)
}

/// Encode an outbound packet. Failing to encode our own payload is a bug,
/// not bad client data.
pub(super) fn packet(op: &str, d: impl Serialize) -> Result<Packet, DispatchError> {
    Packet::new(op, d).map_err(|e| DispatchError::internal(e.to_string()))
}

/// Answer the caller directly.
pub(super) fn reply(
    connections: &ConnectionManager,
    connection_id: ConnectionId,
    packet: Packet,
) -> Result<(), DispatchError> {
    connections
        .send(connection_id, packet)
        .map_err(|e| connection_error(connection_id, e))
}
