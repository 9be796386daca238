//! Player progression events
//!
//! These types describe the effect of a mutation on a `PlayerProfile`, so the
//! settlement layer can build responses and journal lines without re-reading
//! state.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::economy::{AttendanceRewardCalc, AttendanceStreak, LevelChange};
use crate::value_objects::RewardKey;

/// Balance change applied by a reward grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardGrant {
    pub acorns: u64,
    pub xp: u64,
    pub level_change: LevelChange,
}

/// Outcome of a claim against the player's ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Key was new; the grant has been applied
    Granted(RewardGrant),
    /// Key was already in the ledger; nothing changed
    AlreadyClaimed,
}

/// Outcome of an attendance claim.
#[derive(Debug, Clone, PartialEq)]
pub enum AttendanceOutcome {
    Paid {
        reward: AttendanceRewardCalc,
        level_change: LevelChange,
        streak: AttendanceStreak,
    },
    AlreadyClaimed,
}

/// One paid attendance claim, kept so it can be reversed exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    pub key: RewardKey,
    pub date: NaiveDate,
    pub acorns: u64,
    pub xp: u64,
}

/// Effect of revoking one attendance claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceRevoked {
    pub key: RewardKey,
    /// Acorns actually removed (may be less than paid if already spent)
    pub acorns_removed: u64,
    /// XP actually removed
    pub xp_removed: u64,
    pub level_change: LevelChange,
    pub streak: AttendanceStreak,
}
