//! Snowball Shared - the wire vocabulary between server and clients.
//!
//! - `Packet` - the `{op, d}` envelope every message travels in
//! - `codes` - close codes and client error codes
//! - `ops` - operation names
//! - `requests` - typed, validated inbound payloads
//! - `responses` - outbound payloads
//!
//! Pure data types: no I/O and no business logic.

pub mod codes;
pub mod ops;
pub mod packet;
pub mod requests;
pub mod responses;

pub use codes::{CloseCode, ErrorCode};
pub use packet::{Packet, PacketError};
pub use requests::{
    ActionData, AuthData, GameJoinData, GameOverData, GameStartData, MessageCreateData,
    MessageType, RoomJoinData, WaddleData,
};
pub use responses::{
    AuthResponse, ErrorPayload, GameOverResponse, GameStartResponse, MessageCreateResponse,
    RoomJoinResponse, WaddleResponse,
};
