//! Battle status and battle history.

use std::sync::Arc;

use acornquest_domain::{BattleRecord, BattleStatus, PlayerId};

use crate::infrastructure::ports::{AuditRepo, ClockPort, PlayerRepo};
use crate::use_cases::MAX_LIST_LIMIT;

use super::BattleError;

/// Cooldown and shield state for one player, evaluated at the current time.
pub struct GetBattleStatus {
    players: Arc<dyn PlayerRepo>,
    clock: Arc<dyn ClockPort>,
}

impl GetBattleStatus {
    pub fn new(players: Arc<dyn PlayerRepo>, clock: Arc<dyn ClockPort>) -> Self {
        Self { players, clock }
    }

    pub async fn execute(&self, player_id: &PlayerId) -> Result<BattleStatus, BattleError> {
        let player = self
            .players
            .get(player_id)
            .await?
            .ok_or_else(|| BattleError::PlayerNotFound(player_id.to_string()))?;

        Ok(player.profile.battle_status(self.clock.now()))
    }
}

/// Battles a player took part in, newest first.
pub struct BattleHistory {
    players: Arc<dyn PlayerRepo>,
    audit: Arc<dyn AuditRepo>,
}

impl BattleHistory {
    pub fn new(players: Arc<dyn PlayerRepo>, audit: Arc<dyn AuditRepo>) -> Self {
        Self { players, audit }
    }

    pub async fn execute(
        &self,
        player_id: &PlayerId,
        limit: u32,
    ) -> Result<Vec<BattleRecord>, BattleError> {
        if self.players.get(player_id).await?.is_none() {
            return Err(BattleError::PlayerNotFound(player_id.to_string()));
        }

        Ok(self
            .audit
            .battles_for_player(player_id, limit.min(MAX_LIST_LIMIT))
            .await?)
    }
}
