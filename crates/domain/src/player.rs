//! Presence records.

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::session::Session;
use crate::user::UserRecord;

/// What other connections see of a player: derived from the account record
/// and the live session, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub user: UserRecord,
    pub x: f64,
    pub y: f64,
    pub action: Action,
}

impl Player {
    pub fn from_session(user: UserRecord, session: &Session) -> Self {
        Self {
            user,
            x: session.x,
            y: session.y,
            action: session.last_action(),
        }
    }

    /// Record used in removal notices, where position is irrelevant.
    pub fn departed(user: UserRecord) -> Self {
        Self {
            user,
            x: 0.0,
            y: 0.0,
            action: Action::idle(),
        }
    }
}
