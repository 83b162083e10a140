//! Player actions (coarse animation/movement state).

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ActionType {
    Idle = 0,
    Waddle = 1,
    Sit = 2,
    Wave = 3,
    Dance = 4,
    Throw = 5,
    Jump = 6,
    CjBow = 7,
}

impl ActionType {
    /// Transient gestures are broadcast but never stored as the last-known
    /// action, so late joiners don't replay them.
    pub fn is_volatile(self) -> bool {
        matches!(self, Self::Wave | Self::Throw | Self::Jump | Self::CjBow)
    }

    /// Movement between two points; the destination is what gets committed.
    pub fn is_in_transit(self) -> bool {
        matches!(self, Self::Waddle)
    }
}

impl TryFrom<u8> for ActionType {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Idle),
            1 => Ok(Self::Waddle),
            2 => Ok(Self::Sit),
            3 => Ok(Self::Wave),
            4 => Ok(Self::Dance),
            5 => Ok(Self::Throw),
            6 => Ok(Self::Jump),
            7 => Ok(Self::CjBow),
            other => Err(DomainError::parse(format!("unknown action type: {other}"))),
        }
    }
}

impl From<ActionType> for u8 {
    fn from(value: ActionType) -> Self {
        value as u8
    }
}

// Display for ActionType uses the numeric wire value
impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<UserId>,
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
    pub since: Option<f64>,
}

impl Action {
    pub fn idle() -> Self {
        Self {
            player_id: None,
            action_type: ActionType::Idle,
            x: None,
            y: None,
            to_x: None,
            to_y: None,
            since: None,
        }
    }

    pub fn with_player(mut self, player_id: UserId) -> Self {
        self.player_id = Some(player_id);
        self
    }

    /// The position this action leaves the player at, if it carries one.
    pub fn resting_position(&self) -> Option<(f64, f64)> {
        if self.action_type.is_in_transit() {
            if let (Some(x), Some(y)) = (self.to_x, self.to_y) {
                return Some((x, y));
            }
        }
        match (self.x, self.y) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        }
    }
}

impl Default for Action {
    fn default() -> Self {
        Self::idle()
    }
}
