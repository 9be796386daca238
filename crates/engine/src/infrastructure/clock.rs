//! Clock and random implementations.

use crate::infrastructure::ports::{ClockPort, RandomPort};
use chrono::{DateTime, Utc};

/// System clock - uses real time.
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

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
    fn gen_range(&self, min: u32, max: u32) -> u32 {
        use rand::Rng;
        rand::thread_rng().gen_range(min..=max)
    }

    fn gen_index(&self, len: usize) -> usize {
        use rand::Rng;
        rand::thread_rng().gen_range(0..len.max(1))
    }
}

/// Fixed clock for testing.
#[cfg(test)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl ClockPort for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Fixed random for testing: every roll is `roll`, every pick is `index`
/// (wrapped into range).
#[cfg(test)]
pub struct FixedRandom {
    pub roll: u32,
    pub index: usize,
}

#[cfg(test)]
impl FixedRandom {
    pub fn rolls(roll: u32) -> Self {
        Self { roll, index: 0 }
    }
}

#[cfg(test)]
impl RandomPort for FixedRandom {
    fn gen_range(&self, min: u32, max: u32) -> u32 {
        self.roll.clamp(min, max)
    }

    fn gen_index(&self, len: usize) -> usize {
        self.index % len.max(1)
    }
}
