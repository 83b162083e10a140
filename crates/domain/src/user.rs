//! Account records as served by the account store.

use serde::{Deserialize, Serialize};

use crate::ids::UserId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avatar {
    #[serde(default)]
    pub color: i64,
    #[serde(default)]
    pub head: i64,
    #[serde(default)]
    pub face: i64,
    #[serde(default)]
    pub neck: i64,
    #[serde(default)]
    pub body: i64,
    #[serde(default)]
    pub hand: i64,
    #[serde(default)]
    pub feet: i64,
    #[serde(default)]
    pub photo: i64,
    #[serde(default)]
    pub flag: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub avatar: Avatar,
}

impl UserRecord {
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            nickname: None,
            avatar: Avatar::default(),
        }
    }

    /// Name shown to other players.
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.username)
    }
}
