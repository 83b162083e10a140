//! Unified error types for the domain layer
//!
//! Room and game failures carry the numeric code the client branches on;
//! the code values are part of the wire contract and must not change.

use thiserror::Error;

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The connection is not placed in a room of the requested kind
    #[error("Not in a room")]
    NotInRoom,

    #[error("Room is full")]
    RoomFull,

    #[error("Room not found")]
    RoomNotFound,

    #[error("Game not found")]
    GameNotFound,

    #[error("Game is full")]
    GameFull,

    #[error("Game already started")]
    GameAlreadyStarted,

    #[error("Game not started")]
    GameNotStarted,

    /// Validation failed (e.g., invalid field values)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Invalid ID format
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Parse error (for value objects)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Client-facing error code, if this error is one the client can recover from.
    pub fn code(&self) -> Option<u16> {
        match self {
            Self::NotInRoom => Some(4100),
            Self::RoomFull => Some(4101),
            Self::RoomNotFound => Some(4102),
            Self::GameNotFound => Some(4200),
            Self::GameFull => Some(4201),
            Self::GameAlreadyStarted => Some(4202),
            Self::GameNotStarted => Some(4203),
            Self::Validation(_) | Self::InvalidId(_) | Self::Parse(_) => None,
        }
    }
}
