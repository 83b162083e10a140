//! In-memory state storage modules.
//!
//! Stores manage runtime state that doesn't belong in the account database:
//! - `InMemorySessionStore` - per-connection session state

pub mod session;

pub use session::InMemorySessionStore;
