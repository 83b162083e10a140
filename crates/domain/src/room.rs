//! Room keys and categories.
//!
//! Internally a room is a `(category, id)` pair. The prefixed string form
//! (`rooms:100`, `games:7`) exists only at the broadcast relay boundary,
//! where it must stay compatible with the existing fleet.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Broadcast group kinds. A connection is in at most one room per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomCategory {
    Room,
    Game,
}

impl RoomCategory {
    pub const ALL: [RoomCategory; 2] = [RoomCategory::Room, RoomCategory::Game];

    pub fn prefix(self) -> &'static str {
        match self {
            Self::Room => "rooms",
            Self::Game => "games",
        }
    }

    /// Error raised when a connection is expected in this category but is not.
    pub fn absent_error(self) -> DomainError {
        match self {
            Self::Room => DomainError::NotInRoom,
            Self::Game => DomainError::GameNotFound,
        }
    }
}

impl fmt::Display for RoomCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

impl FromStr for RoomCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rooms" => Ok(Self::Room),
            "games" => Ok(Self::Game),
            other => Err(DomainError::parse(format!("unknown room category: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomKey {
    category: RoomCategory,
    id: i64,
}

impl RoomKey {
    pub fn new(category: RoomCategory, id: i64) -> Self {
        Self { category, id }
    }

    pub fn room(id: i64) -> Self {
        Self::new(RoomCategory::Room, id)
    }

    pub fn game(id: i64) -> Self {
        Self::new(RoomCategory::Game, id)
    }

    pub fn category(&self) -> RoomCategory {
        self.category
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn is(&self, category: RoomCategory) -> bool {
        self.category == category
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category.prefix(), self.id)
    }
}

impl FromStr for RoomKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, id) = s
            .split_once(':')
            .ok_or_else(|| DomainError::parse(format!("room key without prefix: {s}")))?;
        let category = prefix.parse::<RoomCategory>()?;
        let id = id
            .parse::<i64>()
            .map_err(|_| DomainError::invalid_id(format!("room id is not numeric: {s}")))?;
        Ok(Self::new(category, id))
    }
}
