//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod accounts;
pub mod auth;
pub mod clock;
pub mod error_sanitizer;
pub mod ports;
pub mod relay;
pub mod settings;
