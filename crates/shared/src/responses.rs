//! Outbound payloads.

use serde::{Deserialize, Serialize};

use snowball_domain::{Player, UserId};

use crate::requests::{MessageCreateData, MessageType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user_id: UserId,
}

/// Body of an `error` packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: u16,
    pub message: String,
}

impl ErrorPayload {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Waddle {
    pub waddle_id: i64,
    pub players: Vec<UserId>,
}

/// Presence snapshot sent to a connection entering a room.
///
/// The joining player is always first in `players`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomJoinResponse {
    pub room_id: i64,
    pub players: Vec<Player>,
    pub waddles: Vec<Waddle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageCreateResponse {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub player_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub joke: Option<i64>,
    pub banned: bool,
}

impl MessageCreateResponse {
    pub fn from_request(player_id: UserId, data: MessageCreateData) -> Self {
        let mut response = Self {
            message_type: data.message_type(),
            player_id,
            message: None,
            emoji: None,
            joke: None,
            banned: false,
        };
        match data {
            MessageCreateData::Text { message } => response.message = Some(message),
            MessageCreateData::Emoji { emoji } => response.emoji = Some(emoji),
            MessageCreateData::Joke { joke } => response.joke = Some(joke),
            MessageCreateData::Tour => {}
        }
        response
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaddleResponse {
    pub waddle_id: i64,
    pub player: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStartResponse {
    pub game_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOverResponse {
    pub coins: i64,
}

impl GameOverResponse {
    pub fn for_score(score: i64) -> Self {
        Self { coins: score / 10 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_message_only_carries_text() {
        let response = MessageCreateResponse::from_request(
            UserId::new(3),
            MessageCreateData::Text {
                message: "hello".into(),
            },
        );
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"type": "TEXT", "player_id": 3, "message": "hello", "banned": false})
        );
    }

    #[test]
    fn coins_are_a_tenth_of_score_rounded_down() {
        assert_eq!(GameOverResponse::for_score(99).coins, 9);
        assert_eq!(GameOverResponse::for_score(100).coins, 10);
        assert_eq!(GameOverResponse::for_score(0).coins, 0);
    }
}
