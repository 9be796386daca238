//! Journal entries - one write-once line per reward-bearing action.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::economy::{AttendanceRewardCalc, SideOutcome};
use crate::events::{AttendanceRevoked, RewardGrant};
use crate::ids::{JournalEntryId, PlayerId};
use crate::value_objects::RewardKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalKind {
    Battle,
    Attendance,
    AttendanceRevoked,
    Assignment,
    Reward,
}

impl JournalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JournalKind::Battle => "battle",
            JournalKind::Attendance => "attendance",
            JournalKind::AttendanceRevoked => "attendance_revoked",
            JournalKind::Assignment => "assignment",
            JournalKind::Reward => "reward",
        }
    }
}

impl fmt::Display for JournalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: JournalEntryId,
    pub player_id: PlayerId,
    pub kind: JournalKind,
    pub message: String,
    pub xp_change: i64,
    pub acorns_change: i64,
    pub timestamp: DateTime<Utc>,
}

impl JournalEntry {
    fn new(
        id: JournalEntryId,
        player_id: PlayerId,
        kind: JournalKind,
        message: String,
        xp_change: i64,
        acorns_change: i64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            player_id,
            kind,
            message,
            xp_change,
            acorns_change,
            timestamp,
        }
    }

    pub fn battle(
        id: JournalEntryId,
        player_id: PlayerId,
        opponent_name: &str,
        won: bool,
        side: &SideOutcome,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let message = if won {
            format!(
                "Won battle against {}! Gained {} XP and {} acorns.",
                opponent_name, side.xp_gained, side.acorns_change
            )
        } else {
            format!(
                "Lost battle to {}. Gained {} XP but lost {} acorns.",
                opponent_name,
                side.xp_gained,
                side.acorns_change.unsigned_abs()
            )
        };
        Self::new(
            id,
            player_id,
            JournalKind::Battle,
            message,
            signed(side.xp_gained),
            side.acorns_change,
            timestamp,
        )
    }

    pub fn attendance(
        id: JournalEntryId,
        player_id: PlayerId,
        reward: &AttendanceRewardCalc,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let mut message = format!("Attended class! +{} acorns +{} XP", reward.acorns, reward.xp);
        if reward.has_bonus() {
            message.push_str(&format!(" ({}x streak bonus!)", reward.streak_multiplier));
        }
        Self::new(
            id,
            player_id,
            JournalKind::Attendance,
            message,
            signed(reward.xp),
            signed(reward.acorns),
            timestamp,
        )
    }

    pub fn attendance_revoked(
        id: JournalEntryId,
        player_id: PlayerId,
        revoked: &AttendanceRevoked,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(
            id,
            player_id,
            JournalKind::AttendanceRevoked,
            format!(
                "Attendance removed: -{} acorns -{} XP",
                revoked.acorns_removed, revoked.xp_removed
            ),
            -signed(revoked.xp_removed),
            -signed(revoked.acorns_removed),
            timestamp,
        )
    }

    pub fn assignment(
        id: JournalEntryId,
        player_id: PlayerId,
        assignment_label: &str,
        grant: &RewardGrant,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(
            id,
            player_id,
            JournalKind::Assignment,
            format!(
                "Completed assignment {}! +{} acorns +{} XP",
                assignment_label, grant.acorns, grant.xp
            ),
            signed(grant.xp),
            signed(grant.acorns),
            timestamp,
        )
    }

    /// Generic ledger reward not tied to a known event kind.
    pub fn reward(
        id: JournalEntryId,
        player_id: PlayerId,
        key: &RewardKey,
        grant: &RewardGrant,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(
            id,
            player_id,
            JournalKind::Reward,
            format!("Reward {}: +{} acorns +{} XP", key, grant.acorns, grant.xp),
            signed(grant.xp),
            signed(grant.acorns),
            timestamp,
        )
    }
}

fn signed(amount: u64) -> i64 {
    i64::try_from(amount).unwrap_or(i64::MAX)
}
