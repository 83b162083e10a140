//! Numeric codes shared with clients.
//!
//! These values are a compatibility contract with deployed clients.

use serde::{Deserialize, Serialize};

use snowball_domain::DomainError;

/// Reason code sent when the server closes a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum CloseCode {
    Normal,
    InvalidData,
    AuthenticationFailed,
    AuthenticationTimeout,
    TokenExpired,
    NotInRoom,
    RoomFull,
    RoomNotFound,
    GameNotFound,
    GameFull,
    GameAlreadyStarted,
    GameNotStarted,
}

impl CloseCode {
    pub fn as_u16(self) -> u16 {
        match self {
            Self::Normal => 1000,
            Self::InvalidData => 1003,
            Self::AuthenticationFailed => 4000,
            Self::AuthenticationTimeout => 4001,
            Self::TokenExpired => 4002,
            Self::NotInRoom => 4100,
            Self::RoomFull => 4101,
            Self::RoomNotFound => 4102,
            Self::GameNotFound => 4200,
            Self::GameFull => 4201,
            Self::GameAlreadyStarted => 4202,
            Self::GameNotStarted => 4203,
        }
    }

    pub fn from_u16(code: u16) -> Option<Self> {
        let code = match code {
            1000 => Self::Normal,
            1003 => Self::InvalidData,
            4000 => Self::AuthenticationFailed,
            4001 => Self::AuthenticationTimeout,
            4002 => Self::TokenExpired,
            4100 => Self::NotInRoom,
            4101 => Self::RoomFull,
            4102 => Self::RoomNotFound,
            4200 => Self::GameNotFound,
            4201 => Self::GameFull,
            4202 => Self::GameAlreadyStarted,
            4203 => Self::GameNotStarted,
            _ => return None,
        };
        Some(code)
    }

    /// Short human-readable reason, used in close frames.
    pub fn reason(self) -> &'static str {
        match self {
            Self::Normal => "Normal closure",
            Self::InvalidData => "Invalid data received",
            Self::AuthenticationFailed => "Authentication failed",
            Self::AuthenticationTimeout => "Authentication timed out",
            Self::TokenExpired => "Token expired",
            Self::NotInRoom => "Not in a room",
            Self::RoomFull => "Room is full",
            Self::RoomNotFound => "Room not found",
            Self::GameNotFound => "Game not found",
            Self::GameFull => "Game is full",
            Self::GameAlreadyStarted => "Game already started",
            Self::GameNotStarted => "Game not started",
        }
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}

impl TryFrom<u16> for CloseCode {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::from_u16(value).ok_or_else(|| format!("unknown close code: {value}"))
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.as_u16(), self.reason())
    }
}

/// Codes carried in non-disconnecting `error` packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum ErrorCode {
    // === Room (41xx) ===
    NotInRoom,
    RoomFull,
    RoomNotFound,
    // === Game (42xx) ===
    GameNotFound,
    GameFull,
    GameAlreadyStarted,
    GameNotStarted,
}

impl ErrorCode {
    pub fn as_u16(self) -> u16 {
        self.close_code().as_u16()
    }

    /// The same condition expressed as a close code, for critical variants.
    pub fn close_code(self) -> CloseCode {
        match self {
            Self::NotInRoom => CloseCode::NotInRoom,
            Self::RoomFull => CloseCode::RoomFull,
            Self::RoomNotFound => CloseCode::RoomNotFound,
            Self::GameNotFound => CloseCode::GameNotFound,
            Self::GameFull => CloseCode::GameFull,
            Self::GameAlreadyStarted => CloseCode::GameAlreadyStarted,
            Self::GameNotStarted => CloseCode::GameNotStarted,
        }
    }

    /// Map a domain failure to its client code, if it has one.
    pub fn from_domain(error: &DomainError) -> Option<Self> {
        let code = match error {
            DomainError::NotInRoom => Self::NotInRoom,
            DomainError::RoomFull => Self::RoomFull,
            DomainError::RoomNotFound => Self::RoomNotFound,
            DomainError::GameNotFound => Self::GameNotFound,
            DomainError::GameFull => Self::GameFull,
            DomainError::GameAlreadyStarted => Self::GameAlreadyStarted,
            DomainError::GameNotStarted => Self::GameNotStarted,
            DomainError::Validation(_) | DomainError::InvalidId(_) | DomainError::Parse(_) => {
                return None
            }
        };
        Some(code)
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.as_u16()
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let code = match value {
            4100 => Self::NotInRoom,
            4101 => Self::RoomFull,
            4102 => Self::RoomNotFound,
            4200 => Self::GameNotFound,
            4201 => Self::GameFull,
            4202 => Self::GameAlreadyStarted,
            4203 => Self::GameNotStarted,
            other => return Err(format!("unknown error code: {other}")),
        };
        Ok(code)
    }
}
