//! Use cases - User story orchestration.
//!
//! - `connection` - authenticate, dispatch and tear down one connection
//! - `rooms` - room membership, spawn placement and presence fan-out

pub mod connection;
pub mod rooms;

pub use connection::ConnectionLifecycle;
pub use rooms::RoomService;
