//! Snowball Engine library.
//!
//! Server-side session backbone for the world server.
//!
//! ## Structure
//!
//! - `dispatch/` - packet registry, dependency resolution and error routing
//! - `events` - in-process lifecycle event bus
//! - `use_cases/` - connection lifecycle, rooms and presence
//! - `stores/` - per-connection session state
//! - `infrastructure/` - port traits and their in-process adapters
//! - `api/` - HTTP and WebSocket entry points
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod dispatch;
pub mod events;
pub mod infrastructure;
pub mod stores;
pub mod use_cases;

/// Test fixtures shared by unit and socket tests.
#[cfg(test)]
pub mod test_fixtures;

pub use app::App;
