//! Randomness implementations.

use crate::infrastructure::ports::RandomPort;

/// System random - uses real randomness.
pub struct SystemRandom;

impl SystemRandom {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomPort for SystemRandom {
    fn gen_range(&self, min: i32, max: i32) -> i32 {
        use rand::Rng;
        if min >= max {
            return min;
        }
        rand::thread_rng().gen_range(min..=max)
    }
}

/// Fixed random for testing: always the lowest value in range.
#[cfg(test)]
pub struct FixedRandom;

#[cfg(test)]
impl RandomPort for FixedRandom {
    fn gen_range(&self, min: i32, _max: i32) -> i32 {
        min
    }
}
