//! Leveling function - fixed-width levels derived from total XP.
//!
//! Level is never stored; it is recomputed from `xp` wherever it is needed.

use serde::{Deserialize, Serialize};

/// XP width of every level.
pub const XP_PER_LEVEL: u64 = 100;

/// Level for a total XP amount: `floor(xp / 100) + 1`.
pub fn level_of(xp: u64) -> u32 {
    // Saturates instead of wrapping for absurd totals
    u32::try_from(xp / XP_PER_LEVEL)
        .map(|l| l.saturating_add(1))
        .unwrap_or(u32::MAX)
}

/// XP accumulated inside the current level (`0..XP_PER_LEVEL`).
pub fn xp_into_level(xp: u64) -> u64 {
    xp - u64::from(level_of(xp) - 1) * XP_PER_LEVEL
}

/// XP needed to go from the start of a level to the next one.
pub fn xp_needed_for_next_level() -> u64 {
    XP_PER_LEVEL
}

/// Level transition detected by comparing XP before and after a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelChange {
    pub before: u32,
    pub after: u32,
}

impl LevelChange {
    pub fn between(xp_before: u64, xp_after: u64) -> Self {
        Self {
            before: level_of(xp_before),
            after: level_of(xp_after),
        }
    }

    pub fn leveled_up(&self) -> bool {
        self.after > self.before
    }

    /// The new level, only when it went up.
    pub fn new_level(&self) -> Option<u32> {
        self.leveled_up().then_some(self.after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_boundaries() {
        assert_eq!(level_of(0), 1);
        assert_eq!(level_of(99), 1);
        assert_eq!(level_of(100), 2);
        assert_eq!(level_of(150), 2);
        assert_eq!(level_of(250), 3);
    }

    #[test]
    fn level_is_non_decreasing() {
        let mut previous = level_of(0);
        for xp in 0..2_000 {
            let level = level_of(xp);
            assert!(level >= 1);
            assert!(level >= previous);
            previous = level;
        }
    }

    #[test]
    fn level_saturates_on_huge_xp() {
        assert_eq!(level_of(u64::MAX), u32::MAX);
    }

    #[test]
    fn xp_into_level_wraps_every_hundred() {
        assert_eq!(xp_into_level(0), 0);
        assert_eq!(xp_into_level(99), 99);
        assert_eq!(xp_into_level(100), 0);
        assert_eq!(xp_into_level(245), 45);
        assert_eq!(xp_needed_for_next_level(), 100);
    }

    #[test]
    fn level_change_detection() {
        let change = LevelChange::between(95, 105);
        assert!(change.leveled_up());
        assert_eq!(change.new_level(), Some(2));

        let same = LevelChange::between(10, 20);
        assert!(!same.leveled_up());
        assert_eq!(same.new_level(), None);
    }
}
