//! Inbound payload schemas.
//!
//! Each schema is decoded from a packet's `d` and then validated; either
//! step failing is treated as invalid data.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use snowball_domain::{Action, ActionType, UserId};

/// First frame on a fresh connection.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AuthData {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RoomJoinData {
    #[serde(default)]
    #[validate(range(min = 0))]
    pub room_id: Option<i64>,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ActionData {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub to_x: Option<f64>,
    #[serde(default)]
    pub to_y: Option<f64>,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub since: Option<f64>,
}

impl ActionData {
    pub fn into_action(self, player_id: UserId) -> Action {
        Action {
            player_id: Some(player_id),
            action_type: self.action_type,
            x: self.x,
            y: self.y,
            to_x: self.to_x,
            to_y: self.to_y,
            since: self.since,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    Text,
    Emoji,
    Joke,
    Tour,
}

/// Chat message, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum MessageCreateData {
    Text { message: String },
    Emoji { emoji: i64 },
    Joke { joke: i64 },
    Tour,
}

impl MessageCreateData {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Text { .. } => MessageType::Text,
            Self::Emoji { .. } => MessageType::Emoji,
            Self::Joke { .. } => MessageType::Joke,
            Self::Tour => MessageType::Tour,
        }
    }
}

impl Validate for MessageCreateData {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        match self {
            Self::Text { message } if message.trim().is_empty() => {
                errors.add("message", ValidationError::new("length"));
            }
            Self::Emoji { emoji } if *emoji < 0 => {
                errors.add("emoji", ValidationError::new("range"));
            }
            Self::Joke { joke } if *joke < 0 => {
                errors.add("joke", ValidationError::new("range"));
            }
            _ => {}
        }
        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WaddleData {
    #[validate(range(min = 0))]
    pub waddle_id: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GameJoinData {
    #[validate(range(min = 0))]
    pub game_id: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GameStartData {
    #[validate(length(min = 1))]
    pub game_id: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GameOverData {
    #[validate(range(min = 0))]
    pub score: i64,
}
