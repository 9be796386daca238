//! Attendance rewards and their undo.
//!
//! Streak state, ledger key, attendance log and balances all live on the
//! player profile, so one conditional commit keeps them in step.

use std::sync::Arc;

use acornquest_domain::{
    AttendanceOutcome, DomainError, JournalEntry, JournalEntryId, PlayerId, RewardKey,
};
use chrono::NaiveDate;
use serde::Serialize;

use crate::infrastructure::ports::{ClockPort, PlayerRepo, SettlementRepo};
use crate::use_cases::retry::{retry_on_conflict, RetryPolicy};

use super::{ClaimResult, RewardError};

/// Payout for one attendance claim.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceReward {
    pub key: RewardKey,
    pub date: NaiveDate,
    pub acorns: u64,
    pub xp: u64,
    pub base_acorns: u64,
    pub base_xp: u64,
    pub streak_multiplier: f64,
    pub streak_label: String,
    pub current_streak: u32,
    pub total_days_attended: u32,
    pub level_up: bool,
    pub new_level: Option<u32>,
}

/// What an attendance undo took back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRevocation {
    pub key: RewardKey,
    pub acorns_removed: u64,
    pub xp_removed: u64,
    pub current_streak: u32,
    pub total_days_attended: u32,
    pub level: u32,
    pub level_down: bool,
}

/// Pay the streak-scaled attendance reward for one class.
pub struct ClaimAttendanceReward {
    players: Arc<dyn PlayerRepo>,
    settlement: Arc<dyn SettlementRepo>,
    clock: Arc<dyn ClockPort>,
    retry: RetryPolicy,
}

impl ClaimAttendanceReward {
    pub fn new(
        players: Arc<dyn PlayerRepo>,
        settlement: Arc<dyn SettlementRepo>,
        clock: Arc<dyn ClockPort>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            players,
            settlement,
            clock,
            retry,
        }
    }

    /// # Arguments
    /// * `date` - Calendar day of the class
    /// * `event_id` - Optional class/calendar event, so several classes on the
    ///   same day each pay once
    pub async fn execute(
        &self,
        player_id: &PlayerId,
        date: NaiveDate,
        event_id: Option<&str>,
    ) -> Result<ClaimResult<AttendanceReward>, RewardError> {
        // Reject a malformed event id before touching storage
        let key = RewardKey::attendance(date, event_id)?;

        retry_on_conflict(&self.retry, "claim_attendance", || {
            self.attempt(player_id, &key, date, event_id)
        })
        .await
    }

    async fn attempt(
        &self,
        player_id: &PlayerId,
        key: &RewardKey,
        date: NaiveDate,
        event_id: Option<&str>,
    ) -> Result<ClaimResult<AttendanceReward>, RewardError> {
        let now = self.clock.now();
        let mut player = self
            .players
            .get(player_id)
            .await?
            .ok_or_else(|| RewardError::PlayerNotFound(player_id.to_string()))?;

        let (reward, level_change, streak) = match player.profile.claim_attendance(date, event_id)?
        {
            AttendanceOutcome::AlreadyClaimed => {
                tracing::debug!(player_id = %player_id, key = %key, "Attendance already claimed");
                return Ok(ClaimResult::AlreadyClaimed);
            }
            AttendanceOutcome::Paid {
                reward,
                level_change,
                streak,
            } => (reward, level_change, streak),
        };

        let entry = JournalEntry::attendance(JournalEntryId::new(), player_id.clone(), &reward, now);

        if let Err(e) = self.settlement.commit_reward(&player, &entry).await {
            if !e.is_conflict() {
                tracing::error!(player_id = %player_id, key = %key, error = %e, "Attendance commit failed");
            }
            return Err(e.into());
        }

        tracing::info!(
            player_id = %player_id,
            key = %key,
            streak = streak.current_streak,
            acorns = reward.acorns,
            xp = reward.xp,
            "Attendance reward paid"
        );

        Ok(ClaimResult::Claimed(AttendanceReward {
            key: key.clone(),
            date,
            acorns: reward.acorns,
            xp: reward.xp,
            base_acorns: reward.base_acorns,
            base_xp: reward.base_xp,
            streak_multiplier: reward.streak_multiplier,
            streak_label: reward.streak_label,
            current_streak: streak.current_streak,
            total_days_attended: streak.total_days_attended,
            level_up: level_change.leveled_up(),
            new_level: level_change.new_level(),
        }))
    }
}

/// Undo one attendance claim.
///
/// Takes back exactly what that claim paid (floored at zero) and rebuilds the
/// streak from the claims that remain.
pub struct RevokeAttendanceReward {
    players: Arc<dyn PlayerRepo>,
    settlement: Arc<dyn SettlementRepo>,
    clock: Arc<dyn ClockPort>,
    retry: RetryPolicy,
}

impl RevokeAttendanceReward {
    pub fn new(
        players: Arc<dyn PlayerRepo>,
        settlement: Arc<dyn SettlementRepo>,
        clock: Arc<dyn ClockPort>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            players,
            settlement,
            clock,
            retry,
        }
    }

    pub async fn execute(
        &self,
        player_id: &PlayerId,
        date: NaiveDate,
        event_id: Option<&str>,
    ) -> Result<AttendanceRevocation, RewardError> {
        RewardKey::attendance(date, event_id)?;

        retry_on_conflict(&self.retry, "revoke_attendance", || {
            self.attempt(player_id, date, event_id)
        })
        .await
    }

    async fn attempt(
        &self,
        player_id: &PlayerId,
        date: NaiveDate,
        event_id: Option<&str>,
    ) -> Result<AttendanceRevocation, RewardError> {
        let now = self.clock.now();
        let mut player = self
            .players
            .get(player_id)
            .await?
            .ok_or_else(|| RewardError::PlayerNotFound(player_id.to_string()))?;

        let revoked = match player.profile.revoke_attendance(date, event_id) {
            Ok(revoked) => revoked,
            Err(DomainError::NotFound { id, .. }) => {
                tracing::warn!(player_id = %player_id, key = %id, "No attendance claim to revoke");
                return Err(RewardError::RevokeNotAllowed(format!(
                    "no attendance claim {id}"
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let entry = JournalEntry::attendance_revoked(
            JournalEntryId::new(),
            player_id.clone(),
            &revoked,
            now,
        );

        if let Err(e) = self.settlement.commit_reward(&player, &entry).await {
            if !e.is_conflict() {
                tracing::error!(player_id = %player_id, error = %e, "Attendance revoke commit failed");
            }
            return Err(e.into());
        }

        tracing::info!(
            player_id = %player_id,
            key = %revoked.key,
            acorns_removed = revoked.acorns_removed,
            xp_removed = revoked.xp_removed,
            streak = revoked.streak.current_streak,
            "Attendance reward revoked"
        );

        Ok(AttendanceRevocation {
            key: revoked.key,
            acorns_removed: revoked.acorns_removed,
            xp_removed: revoked.xp_removed,
            current_streak: revoked.streak.current_streak,
            total_days_attended: revoked.streak.total_days_attended,
            level: player.profile.level(),
            level_down: revoked.level_change.after < revoked.level_change.before,
        })
    }
}
