//! Economy rules - pure, deterministic calculators.
//!
//! Nothing in here performs I/O or reads a clock. Time and randomness are
//! parameters so every rule can be tested with fixed inputs.

pub mod battle;
pub mod gates;
pub mod leveling;
pub mod streak;

pub use battle::{
    acorns_stolen, power, resolve_battle, xp_reward, BattleOutcome, BattleSide, BattleSnapshot,
    PowerRolls, SideOutcome, ROLL_MAX,
};
pub use gates::{
    battle_cooldown, can_battle, is_shielded, shield_duration, shield_time_remaining,
    time_until_next_battle, BattleStatus,
};
pub use leveling::{level_of, xp_into_level, xp_needed_for_next_level, LevelChange, XP_PER_LEVEL};
pub use streak::{
    calculate_attendance, tier_for, AttendanceRewardCalc, AttendanceStreak, StreakTier,
    BASE_ACORNS, BASE_XP, STREAK_TIERS,
};
