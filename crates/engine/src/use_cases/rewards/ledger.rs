//! Idempotent claim ledger.

use std::sync::Arc;

use acornquest_domain::{
    ClaimOutcome, JournalEntry, JournalEntryId, PlayerId, RewardKey, RewardKind,
};
use serde::Serialize;

use crate::infrastructure::ports::{ClockPort, PlayerRepo, SettlementRepo};
use crate::use_cases::retry::{retry_on_conflict, RetryPolicy};

use super::{ClaimResult, RewardError};

/// Balances after a paid claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardResult {
    pub key: RewardKey,
    pub acorns: u64,
    pub xp: u64,
    pub level_up: bool,
    pub new_level: Option<u32>,
    pub level: u32,
    pub total_xp: u64,
    pub total_acorns: u64,
}

/// Pay a reward at most once per ledger key.
pub struct ClaimReward {
    players: Arc<dyn PlayerRepo>,
    settlement: Arc<dyn SettlementRepo>,
    clock: Arc<dyn ClockPort>,
    retry: RetryPolicy,
}

impl ClaimReward {
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

    /// Claim `key` for `player_id`.
    ///
    /// The membership check and the credit are committed together against the
    /// version that was read. Two racing claims for the same key cannot both
    /// commit: the loser conflicts, re-reads, and sees the key already paid.
    pub async fn execute(
        &self,
        player_id: &PlayerId,
        key: &RewardKey,
        acorns: u64,
        xp: u64,
    ) -> Result<ClaimResult<RewardResult>, RewardError> {
        retry_on_conflict(&self.retry, "claim_reward", || {
            self.attempt(player_id, key, acorns, xp)
        })
        .await
    }

    async fn attempt(
        &self,
        player_id: &PlayerId,
        key: &RewardKey,
        acorns: u64,
        xp: u64,
    ) -> Result<ClaimResult<RewardResult>, RewardError> {
        let now = self.clock.now();
        let mut player = self
            .players
            .get(player_id)
            .await?
            .ok_or_else(|| RewardError::PlayerNotFound(player_id.to_string()))?;

        let grant = match player.profile.claim_reward(key.clone(), acorns, xp) {
            ClaimOutcome::AlreadyClaimed => {
                tracing::debug!(player_id = %player_id, key = %key, "Reward already claimed");
                return Ok(ClaimResult::AlreadyClaimed);
            }
            ClaimOutcome::Granted(grant) => grant,
        };

        let entry = match key.kind() {
            RewardKind::Assignment => JournalEntry::assignment(
                JournalEntryId::new(),
                player_id.clone(),
                assignment_label(key),
                &grant,
                now,
            ),
            RewardKind::Attendance | RewardKind::Other => {
                JournalEntry::reward(JournalEntryId::new(), player_id.clone(), key, &grant, now)
            }
        };

        if let Err(e) = self.settlement.commit_reward(&player, &entry).await {
            if !e.is_conflict() {
                tracing::error!(player_id = %player_id, key = %key, error = %e, "Reward commit failed");
            }
            return Err(e.into());
        }

        tracing::info!(
            player_id = %player_id,
            key = %key,
            acorns = grant.acorns,
            xp = grant.xp,
            level_up = grant.level_change.leveled_up(),
            "Reward paid"
        );

        Ok(ClaimResult::Claimed(RewardResult {
            key: key.clone(),
            acorns: grant.acorns,
            xp: grant.xp,
            level_up: grant.level_change.leveled_up(),
            new_level: grant.level_change.new_level(),
            level: player.profile.level(),
            total_xp: player.profile.xp(),
            total_acorns: player.profile.acorns(),
        }))
    }
}

/// `assignment:{course}:{assignment}` -> `{assignment}`
fn assignment_label(key: &RewardKey) -> &str {
    key.as_str().rsplit(':').next().unwrap_or(key.as_str())
}
