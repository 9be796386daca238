//! Temporal gates - battle cooldown and defender shield.
//!
//! All functions take `now` explicitly; callers pass the server clock so the
//! windows never depend on a client's clock.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Minimum time between two battles initiated by the same player.
pub const BATTLE_COOLDOWN_HOURS: i64 = 8;
/// How long a defender is protected after being battled.
pub const SHIELD_DURATION_HOURS: i64 = 8;

pub fn battle_cooldown() -> Duration {
    Duration::hours(BATTLE_COOLDOWN_HOURS)
}

pub fn shield_duration() -> Duration {
    Duration::hours(SHIELD_DURATION_HOURS)
}

/// True when the player never battled or the cooldown has fully elapsed.
/// The boundary is inclusive: exactly 8h after the last battle is allowed.
pub fn can_battle(last_battle_time: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last_battle_time {
        None => true,
        Some(last) => now - last >= battle_cooldown(),
    }
}

/// Remaining cooldown, zero when a battle is allowed.
pub fn time_until_next_battle(
    last_battle_time: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Duration {
    match last_battle_time {
        None => Duration::zero(),
        Some(last) => (last + battle_cooldown() - now).max(Duration::zero()),
    }
}

/// True while `now` is strictly before the shield end.
pub fn is_shielded(shield_end_time: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    shield_end_time.is_some_and(|end| now < end)
}

/// Remaining shield time, zero when unshielded.
pub fn shield_time_remaining(
    shield_end_time: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Duration {
    match shield_end_time {
        None => Duration::zero(),
        Some(end) => (end - now).max(Duration::zero()),
    }
}

/// Combined view of both gates for one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleStatus {
    pub can_battle: bool,
    pub can_battle_in_secs: i64,
    pub is_shielded: bool,
    pub shield_remaining_secs: i64,
}

impl BattleStatus {
    pub fn evaluate(
        last_battle_time: Option<DateTime<Utc>>,
        shield_end_time: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            can_battle: can_battle(last_battle_time, now),
            can_battle_in_secs: time_until_next_battle(last_battle_time, now).num_seconds(),
            is_shielded: is_shielded(shield_end_time, now),
            shield_remaining_secs: shield_time_remaining(shield_end_time, now).num_seconds(),
        }
    }

    pub fn can_battle_in(&self) -> Duration {
        Duration::seconds(self.can_battle_in_secs)
    }

    pub fn shield_remaining(&self) -> Duration {
        Duration::seconds(self.shield_remaining_secs)
    }
}
