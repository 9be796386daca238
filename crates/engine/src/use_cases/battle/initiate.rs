//! Initiate battle use case.
//!
//! Picks a random unshielded opponent, resolves the fight and settles both
//! players, the battle record and both journal rows in one commit.

use std::sync::Arc;

use acornquest_domain::economy::battle_cooldown;
use acornquest_domain::{
    resolve_battle, BattleId, BattleOutcome, BattleRecord, BattleSide, JournalEntry,
    JournalEntryId, PlayerId, PowerRolls, ROLL_MAX,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::infrastructure::ports::{
    ClockPort, PlayerRepo, RandomPort, SettlementRepo, VersionedPlayer,
};
use crate::use_cases::retry::{retry_on_conflict, RetryPolicy};

use super::BattleError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentSummary {
    pub id: PlayerId,
    pub display_name: String,
    pub level: u32,
}

/// What the attacker sees after a settled battle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleReport {
    pub battle_id: BattleId,
    pub won: bool,
    pub opponent: OpponentSummary,
    pub attacker_power: u64,
    pub defender_power: u64,
    pub xp_gained: u64,
    pub acorns_change: i64,
    pub new_xp: u64,
    pub new_level: u32,
    pub new_acorns: u64,
    pub level_up: bool,
    pub next_battle_at: DateTime<Utc>,
    #[serde(skip)]
    pub outcome: BattleOutcome,
}

/// Initiate battle use case.
pub struct InitiateBattle {
    players: Arc<dyn PlayerRepo>,
    settlement: Arc<dyn SettlementRepo>,
    clock: Arc<dyn ClockPort>,
    random: Arc<dyn RandomPort>,
    retry: RetryPolicy,
}

impl InitiateBattle {
    pub fn new(
        players: Arc<dyn PlayerRepo>,
        settlement: Arc<dyn SettlementRepo>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            players,
            settlement,
            clock,
            random,
            retry,
        }
    }

    /// Start a battle for `attacker_id`.
    ///
    /// A lost version race is retried from a fresh read, which re-checks the
    /// cooldown and re-draws the opponent. Storage failures are returned as-is
    /// and never repeated, since the commit may have landed.
    pub async fn execute(&self, attacker_id: &PlayerId) -> Result<BattleReport, BattleError> {
        retry_on_conflict(&self.retry, "initiate_battle", || self.attempt(attacker_id)).await
    }

    async fn attempt(&self, attacker_id: &PlayerId) -> Result<BattleReport, BattleError> {
        let now = self.clock.now();

        // 1. Attacker must exist and be off cooldown
        let attacker = self
            .players
            .get(attacker_id)
            .await?
            .ok_or_else(|| BattleError::PlayerNotFound(attacker_id.to_string()))?;

        let status = attacker.profile.battle_status(now);
        if !status.can_battle {
            tracing::warn!(
                player_id = %attacker_id,
                remaining_secs = status.can_battle_in_secs,
                "Battle rejected, cooldown active"
            );
            return Err(BattleError::NotEligible {
                remaining_secs: status.can_battle_in_secs,
            });
        }

        // 2. Uniform pick among everyone else who is not shielded
        let defender = self.pick_opponent(attacker_id, now).await?;

        // 3. Resolve
        let rolls = PowerRolls::new(
            self.random.gen_range(0, ROLL_MAX),
            self.random.gen_range(0, ROLL_MAX),
        );
        let outcome = resolve_battle(
            &attacker.profile.battle_snapshot(),
            &defender.profile.battle_snapshot(),
            rolls,
        );

        // 4. Build the audit trail from the pre-battle snapshots
        let record = BattleRecord::new(
            BattleId::new(),
            &attacker.profile,
            &defender.profile,
            &outcome,
            now,
        );
        let entries = [
            JournalEntry::battle(
                JournalEntryId::new(),
                attacker_id.clone(),
                defender.profile.display_name().as_str(),
                outcome.attacker_won,
                &outcome.attacker,
                now,
            ),
            JournalEntry::battle(
                JournalEntryId::new(),
                defender.id().clone(),
                attacker.profile.display_name().as_str(),
                !outcome.attacker_won,
                &outcome.defender,
                now,
            ),
        ];

        let opponent = OpponentSummary {
            id: defender.id().clone(),
            display_name: defender.profile.display_name().to_string(),
            level: defender.profile.level(),
        };

        // 5. Apply to both and commit as one unit
        let mut attacker_after = attacker;
        let level_change = attacker_after.profile.apply_battle(
            BattleSide::Attacker,
            &outcome.attacker,
            now,
        );
        let mut defender_after = defender;
        defender_after
            .profile
            .apply_battle(BattleSide::Defender, &outcome.defender, now);

        if let Err(e) = self
            .settlement
            .commit_battle(&attacker_after, &defender_after, &record, &entries)
            .await
        {
            if !e.is_conflict() {
                tracing::error!(
                    attacker_id = %attacker_id,
                    defender_id = %opponent.id,
                    error = %e,
                    "Battle settlement failed"
                );
            }
            return Err(e.into());
        }

        tracing::info!(
            battle_id = %record.id,
            attacker_id = %attacker_id,
            defender_id = %opponent.id,
            attacker_won = outcome.attacker_won,
            attacker_power = outcome.attacker_power,
            defender_power = outcome.defender_power,
            acorns_stolen = outcome.acorns_stolen,
            "Battle settled"
        );

        Ok(BattleReport {
            battle_id: record.id,
            won: outcome.attacker_won,
            opponent,
            attacker_power: outcome.attacker_power,
            defender_power: outcome.defender_power,
            xp_gained: outcome.attacker.xp_gained,
            acorns_change: outcome.attacker.acorns_change,
            new_xp: outcome.attacker.new_xp,
            new_level: outcome.attacker.new_level,
            new_acorns: outcome.attacker.new_acorns,
            level_up: level_change.leveled_up(),
            next_battle_at: now + battle_cooldown(),
            outcome,
        })
    }

    async fn pick_opponent(
        &self,
        attacker_id: &PlayerId,
        now: DateTime<Utc>,
    ) -> Result<VersionedPlayer, BattleError> {
        let mut candidates: Vec<VersionedPlayer> = self
            .players
            .list_all()
            .await?
            .into_iter()
            .filter(|p| p.id() != attacker_id && !p.profile.is_shielded(now))
            .collect();

        if candidates.is_empty() {
            tracing::warn!(player_id = %attacker_id, "No unshielded opponent available");
            return Err(BattleError::NoOpponentAvailable);
        }

        let index = self.random.gen_index(candidates.len()) % candidates.len();
        Ok(candidates.swap_remove(index))
    }
}
