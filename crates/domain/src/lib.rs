//! AcornQuest domain.
//!
//! Pure progression and battle-economy rules plus the `PlayerProfile`
//! aggregate that owns a player's balances, temporal gates, claim ledger and
//! attendance history. No I/O, no clock, no randomness: those are injected by
//! the engine.

pub mod aggregates;
pub mod economy;
pub mod entities;
pub mod error;
pub mod events;
pub mod ids;
pub mod value_objects;

pub use aggregates::{PlayerProfile, STARTING_ACORNS};
pub use entities::{BattleParticipant, BattleRecord, JournalEntry, JournalKind};
pub use error::DomainError;
pub use events::{
    AttendanceEntry, AttendanceOutcome, AttendanceRevoked, ClaimOutcome, RewardGrant,
};
pub use ids::{BattleId, JournalEntryId, PlayerId};
pub use value_objects::{DisplayName, RewardKey, RewardKind};

// Re-export the economy rules most callers need
pub use economy::{
    level_of, resolve_battle, xp_into_level, xp_needed_for_next_level, AttendanceRewardCalc,
    AttendanceStreak, BattleOutcome, BattleSide, BattleSnapshot, BattleStatus, LevelChange,
    PowerRolls, SideOutcome, ROLL_MAX,
};
