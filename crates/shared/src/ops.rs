//! Operation names used on the wire.

pub const AUTH: &str = "auth";
pub const ERROR: &str = "error";

pub const ROOM_JOIN: &str = "room:join";

pub const PLAYER_ADD: &str = "player:add";
pub const PLAYER_REMOVE: &str = "player:remove";
pub const PLAYER_ACTION: &str = "player:action";
pub const PLAYER_PING: &str = "player:ping";
pub const PLAYER_PONG: &str = "player:pong";

pub const MESSAGE_CREATE: &str = "message:create";

pub const WADDLE_JOIN: &str = "waddle:join";
pub const WADDLE_LEAVE: &str = "waddle:leave";

pub const GAME_JOIN: &str = "game:join";
pub const GAME_START: &str = "game:start";
pub const GAME_OVER: &str = "game:over";

/// Matches any operation not otherwise registered in a namespace.
pub const WILDCARD: &str = "*";
