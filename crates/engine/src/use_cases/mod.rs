//! Use cases - Settlement orchestration.
//!
//! Each module contains use cases for a specific area. Every mutation is a
//! read, a pure change on the domain aggregate, and a conditional commit.

pub mod battle;
pub mod players;
pub mod retry;
pub mod rewards;

pub use battle::BattleUseCases;
pub use players::PlayerUseCases;
pub use rewards::RewardUseCases;

/// Upper bound on any list read (journal, battle history, leaderboard).
pub const MAX_LIST_LIMIT: u32 = 100;

/// List size used when the caller does not ask for one.
pub const DEFAULT_LIST_LIMIT: u32 = 20;
