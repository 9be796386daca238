//! Immutable record of one resolved battle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregates::PlayerProfile;
use crate::economy::{BattleOutcome, SideOutcome};
use crate::ids::{BattleId, PlayerId};

/// One side of a battle as it was when the battle happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleParticipant {
    pub player_id: PlayerId,
    pub name_at_battle: String,
    pub level_at_battle: u32,
    pub xp_at_battle: u64,
    pub xp_gained: u64,
    pub acorns_change: i64,
}

impl BattleParticipant {
    fn snapshot(profile: &PlayerProfile, side: &SideOutcome) -> Self {
        Self {
            player_id: profile.id().clone(),
            name_at_battle: profile.display_name().to_string(),
            level_at_battle: profile.level(),
            xp_at_battle: profile.xp(),
            xp_gained: side.xp_gained,
            acorns_change: side.acorns_change,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleRecord {
    pub id: BattleId,
    pub winner_id: PlayerId,
    pub attacker: BattleParticipant,
    pub defender: BattleParticipant,
    pub timestamp: DateTime<Utc>,
}

impl BattleRecord {
    /// Build the record from the profiles as read *before* settlement.
    pub fn new(
        id: BattleId,
        attacker: &PlayerProfile,
        defender: &PlayerProfile,
        outcome: &BattleOutcome,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let winner_id = if outcome.attacker_won {
            attacker.id().clone()
        } else {
            defender.id().clone()
        };

        Self {
            id,
            winner_id,
            attacker: BattleParticipant::snapshot(attacker, &outcome.attacker),
            defender: BattleParticipant::snapshot(defender, &outcome.defender),
            timestamp,
        }
    }

    pub fn attacker_id(&self) -> &PlayerId {
        &self.attacker.player_id
    }

    pub fn defender_id(&self) -> &PlayerId {
        &self.defender.player_id
    }

    pub fn involves(&self, player_id: &PlayerId) -> bool {
        self.attacker_id() == player_id || self.defender_id() == player_id
    }
}
