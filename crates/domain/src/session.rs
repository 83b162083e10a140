//! Per-connection mutable state.

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::ids::UserId;
use crate::room::{RoomCategory, RoomKey};

/// State held for one live connection.
///
/// A session only exists once the connection has authenticated, so
/// `user_id` is always set on stored sessions; it is an `Option` so that a
/// freshly constructed value can be distinguished from a placed one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Option<UserId>,
    /// Convenience cache of the current `rooms:` room. Membership itself
    /// lives in the broadcast relay.
    pub room_id: Option<i64>,
    /// Convenience cache of the current `games:` room.
    pub game_id: Option<i64>,
    pub x: f64,
    pub y: f64,
    pub action: Option<Action>,
}

impl Session {
    pub fn authenticated(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    /// Place the connection in a room at the given coordinates, resetting
    /// the last known action to idle.
    pub fn place(&mut self, room: RoomKey, x: f64, y: f64) {
        match room.category() {
            RoomCategory::Room => self.room_id = Some(room.id()),
            RoomCategory::Game => self.game_id = Some(room.id()),
        }
        self.x = x;
        self.y = y;
        self.action = Some(Action::idle());
    }

    /// Forget the cached room of one category, if it is `room`.
    pub fn vacate(&mut self, room: RoomKey) {
        let slot = match room.category() {
            RoomCategory::Room => &mut self.room_id,
            RoomCategory::Game => &mut self.game_id,
        };
        if *slot == Some(room.id()) {
            *slot = None;
        }
    }

    /// Commit an action report.
    ///
    /// Volatile gestures never replace the stored action. Position follows
    /// the action's resting point (the destination for in-transit moves).
    pub fn record_action(&mut self, action: &Action) {
        if let Some((x, y)) = action.resting_position() {
            self.x = x;
            self.y = y;
        }
        if !action.action_type.is_volatile() {
            let mut stored = action.clone();
            stored.player_id = None;
            self.action = Some(stored);
        }
    }

    pub fn last_action(&self) -> Action {
        self.action.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionType;

    fn report(action_type: ActionType, x: f64, y: f64) -> Action {
        Action {
            action_type,
            x: Some(x),
            y: Some(y),
            ..Action::idle()
        }
    }

    #[test]
    fn place_resets_action_to_idle() {
        let mut session = Session::authenticated(UserId::new(1));
        session.action = Some(report(ActionType::Sit, 1.0, 1.0));
        session.place(RoomKey::room(100), 500.0, 700.0);
        assert_eq!(session.room_id, Some(100));
        assert_eq!((session.x, session.y), (500.0, 700.0));
        assert_eq!(session.last_action().action_type, ActionType::Idle);
    }

    #[test]
    fn game_placement_keeps_room_cache() {
        let mut session = Session::authenticated(UserId::new(1));
        session.place(RoomKey::room(100), 500.0, 700.0);
        session.place(RoomKey::game(9), 500.0, 700.0);
        assert_eq!(session.room_id, Some(100));
        assert_eq!(session.game_id, Some(9));

        session.vacate(RoomKey::game(9));
        assert_eq!(session.game_id, None);
        session.vacate(RoomKey::room(200));
        assert_eq!(session.room_id, Some(100));
    }

    #[test]
    fn volatile_action_moves_but_is_not_stored() {
        let mut session = Session::authenticated(UserId::new(1));
        session.place(RoomKey::room(100), 500.0, 700.0);
        session.record_action(&report(ActionType::Wave, 510.0, 710.0));
        assert_eq!((session.x, session.y), (510.0, 710.0));
        assert_eq!(session.last_action().action_type, ActionType::Idle);
    }

    #[test]
    fn waddle_commits_destination() {
        let mut session = Session::authenticated(UserId::new(1));
        session.place(RoomKey::room(100), 500.0, 700.0);
        let mut waddle = report(ActionType::Waddle, 500.0, 700.0);
        waddle.to_x = Some(900.0);
        waddle.to_y = Some(720.0);
        session.record_action(&waddle);
        assert_eq!((session.x, session.y), (900.0, 720.0));
        assert_eq!(session.last_action().action_type, ActionType::Waddle);
    }

    #[test]
    fn action_without_position_keeps_coordinates() {
        let mut session = Session::authenticated(UserId::new(1));
        session.place(RoomKey::room(100), 500.0, 700.0);
        session.record_action(&Action {
            action_type: ActionType::Dance,
            ..Action::idle()
        });
        assert_eq!((session.x, session.y), (500.0, 700.0));
        assert_eq!(session.last_action().action_type, ActionType::Dance);
    }
}
