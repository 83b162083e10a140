//! Snowball domain model.
//!
//! Identifiers, room keys, the action model, per-connection sessions,
//! account records and the presence records derived from them. Nothing in
//! this crate performs I/O.

pub mod action;
pub mod error;
pub mod ids;
pub mod player;
pub mod room;
pub mod session;
pub mod user;

pub use action::{Action, ActionType};
pub use error::DomainError;
pub use ids::{ConnectionId, UserId};
pub use player::Player;
pub use room::{RoomCategory, RoomKey};
pub use session::Session;
pub use user::{Avatar, UserRecord};
