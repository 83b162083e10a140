//! Dispatch error taxonomy.
//!
//! Every failure during resolution or handling ends up as one of these,
//! and the dispatcher decides what the connection sees from the variant
//! alone.

use snowball_domain::DomainError;
use snowball_shared::{CloseCode, PacketError};
use validator::ValidationErrors;

use crate::infrastructure::error_sanitizer::{messages, sanitize_error, sanitize_repo_error};
use crate::infrastructure::ports::{RelayError, RepoError, SessionError, TokenError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("No credentials presented")]
    Missing,
    #[error("Token expired")]
    Expired,
    #[error("Authentication failed")]
    Invalid,
    #[error("Authentication timed out")]
    Timeout,
}

impl AuthError {
    pub fn close_code(&self) -> CloseCode {
        match self {
            Self::Missing | Self::Invalid => CloseCode::AuthenticationFailed,
            Self::Expired => CloseCode::TokenExpired,
            Self::Timeout => CloseCode::AuthenticationTimeout,
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::Expired => Self::Expired,
            TokenError::Invalid(reason) => {
                tracing::debug!(reason = %reason, "Token rejected");
                Self::Invalid
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    /// Payload could not be decoded or validated. Disconnects.
    #[error("Invalid data: {0}")]
    Protocol(String),

    /// Recoverable business failure carrying a client code.
    #[error(transparent)]
    Domain(DomainError),

    /// Failure that must end the connection with `code`.
    #[error("{message}")]
    Critical { code: CloseCode, message: String },

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Something the dispatch relied on vanished mid-flight.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Anything unanticipated; logged and swallowed.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    pub fn critical(code: CloseCode, message: impl Into<String>) -> Self {
        Self::Critical {
            code,
            message: message.into(),
        }
    }

    pub fn authentication_failed() -> Self {
        Self::critical(CloseCode::AuthenticationFailed, messages::AUTHENTICATION_FAILED)
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether this is the "not in a room of that kind" condition.
    pub fn is_absent_room(&self) -> bool {
        matches!(
            self,
            Self::Domain(DomainError::NotInRoom) | Self::Domain(DomainError::GameNotFound)
        )
    }
}

impl From<DomainError> for DispatchError {
    fn from(error: DomainError) -> Self {
        if error.code().is_some() {
            Self::Domain(error)
        } else {
            Self::Protocol(error.to_string())
        }
    }
}

impl From<PacketError> for DispatchError {
    fn from(error: PacketError) -> Self {
        Self::Protocol(error.to_string())
    }
}

impl From<ValidationErrors> for DispatchError {
    fn from(error: ValidationErrors) -> Self {
        Self::Protocol(error.to_string())
    }
}

impl From<SessionError> for DispatchError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::NotFound(id) => Self::not_found("session", id),
            other => Self::Internal(sanitize_error(&other, "accessing session state")),
        }
    }
}

impl From<RelayError> for DispatchError {
    fn from(error: RelayError) -> Self {
        Self::Internal(sanitize_error(&error, "broadcasting"))
    }
}

impl From<RepoError> for DispatchError {
    fn from(error: RepoError) -> Self {
        Self::Internal(sanitize_repo_error(&error, "load account"))
    }
}
