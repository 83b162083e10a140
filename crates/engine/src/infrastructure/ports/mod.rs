//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Session state (could swap in-process -> shared store)
//! - Room membership and fan-out (could swap in-process -> pub/sub backplane)
//! - Account lookup and token verification
//! - Random (for testing)

mod error;
mod external;
mod repos;
mod testing;

// =============================================================================
// Repository Ports
// =============================================================================
pub use repos::AccountRepo;

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::{BroadcastRelay, SessionMutation, SessionStore, Target, TokenVerifier};

// =============================================================================
// Testability Ports
// =============================================================================
pub use testing::RandomPort;

// =============================================================================
// Error Types
// =============================================================================
pub use error::{RelayError, RepoError, SessionError, TokenError};

// =============================================================================
// Mocks (test builds only)
// =============================================================================
#[cfg(test)]
pub use repos::MockAccountRepo;
#[cfg(test)]
pub use external::MockTokenVerifier;
#[cfg(test)]
pub use testing::MockRandomPort;
