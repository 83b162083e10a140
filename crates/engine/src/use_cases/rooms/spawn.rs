//! Spawn placement for connections that join without naming a room.

use std::sync::Arc;

use crate::infrastructure::ports::RandomPort;

/// Rooms a player may be dropped into when none is requested.
pub const SPAWN_ROOMS: [i64; 12] = [100, 200, 230, 300, 400, 800, 801, 802, 805, 807, 809, 810];

/// Rectangle safe spawn coordinates are drawn from. Not room specific.
pub const SAFE_X: (i32, i32) = (473, 1247);
pub const SAFE_Y: (i32, i32) = (704, 734);

/// Picks spawn rooms and coordinates. Room capacity is not consulted.
pub struct SpawnPolicy {
    random: Arc<dyn RandomPort>,
}

impl SpawnPolicy {
    pub fn new(random: Arc<dyn RandomPort>) -> Self {
        Self { random }
    }

    /// A spawn room chosen uniformly at random.
    pub fn pick_room(&self) -> i64 {
        let last = SPAWN_ROOMS.len() as i32 - 1;
        let index = self.random.gen_range(0, last);
        usize::try_from(index)
            .ok()
            .and_then(|i| SPAWN_ROOMS.get(i).copied())
            .unwrap_or(SPAWN_ROOMS[0])
    }

    pub fn safe_coordinates(&self, _room_id: i64) -> (f64, f64) {
        let x = self.random.gen_range(SAFE_X.0, SAFE_X.1);
        let y = self.random.gen_range(SAFE_Y.0, SAFE_Y.1);
        (f64::from(x), f64::from(y))
    }
}
