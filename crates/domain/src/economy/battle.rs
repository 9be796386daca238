//! Battle resolution - pure outcome computation from two player snapshots.
//!
//! The random component of battle power is injected through [`PowerRolls`],
//! which makes resolution fully deterministic for a given input.

use serde::{Deserialize, Serialize};

use super::leveling::level_of;

/// Upper bound (inclusive) of the per-battle power roll.
pub const ROLL_MAX: u32 = 200;

/// Flat XP paid to the winner before the opponent-level bonus.
pub const WINNER_BASE_XP: u64 = 50;
/// XP per opponent level paid to the winner.
pub const WINNER_XP_PER_OPPONENT_LEVEL: u64 = 10;
/// Flat XP paid to the loser before the opponent-level bonus.
pub const LOSER_BASE_XP: u64 = 20;
/// XP per opponent level paid to the loser.
pub const LOSER_XP_PER_OPPONENT_LEVEL: u64 = 5;

/// Acorns always taken from the loser, before the XP-scaled part.
pub const BASE_ACORNS_STOLEN: u64 = 2;
/// Winner XP per additional stolen acorn.
pub const XP_PER_STOLEN_ACORN: u64 = 20;

/// The state of one side at battle time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleSnapshot {
    pub xp: u64,
    pub acorns: u64,
}

impl BattleSnapshot {
    pub fn new(xp: u64, acorns: u64) -> Self {
        Self { xp, acorns }
    }

    pub fn level(&self) -> u32 {
        level_of(self.xp)
    }
}

/// Random rolls for both sides, each in `0..=ROLL_MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PowerRolls {
    pub attacker: u32,
    pub defender: u32,
}

impl PowerRolls {
    pub fn new(attacker: u32, defender: u32) -> Self {
        Self { attacker, defender }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleSide {
    Attacker,
    Defender,
}

/// Deltas and resulting balances for one side of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideOutcome {
    pub xp_gained: u64,
    /// Signed acorn change actually applied to this side.
    pub acorns_change: i64,
    pub new_xp: u64,
    pub new_level: u32,
    pub new_acorns: u64,
}

/// Result of [`resolve_battle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleOutcome {
    pub attacker_won: bool,
    pub attacker_power: u64,
    pub defender_power: u64,
    pub acorns_stolen: u64,
    pub attacker: SideOutcome,
    pub defender: SideOutcome,
}

impl BattleOutcome {
    pub fn winner(&self) -> BattleSide {
        if self.attacker_won {
            BattleSide::Attacker
        } else {
            BattleSide::Defender
        }
    }

    pub fn side(&self, side: BattleSide) -> &SideOutcome {
        match side {
            BattleSide::Attacker => &self.attacker,
            BattleSide::Defender => &self.defender,
        }
    }
}

/// Battle power: `level * 100 + xp + roll`.
pub fn power(snapshot: &BattleSnapshot, roll: u32) -> u64 {
    u64::from(snapshot.level())
        .saturating_mul(100)
        .saturating_add(snapshot.xp)
        .saturating_add(u64::from(roll.min(ROLL_MAX)))
}

/// XP awarded to one side given the opponent's level.
pub fn xp_reward(opponent_level: u32, is_winner: bool) -> u64 {
    let opponent_level = u64::from(opponent_level);
    if is_winner {
        WINNER_BASE_XP + opponent_level * WINNER_XP_PER_OPPONENT_LEVEL
    } else {
        LOSER_BASE_XP + opponent_level * LOSER_XP_PER_OPPONENT_LEVEL
    }
}

/// Acorns transferred from loser to winner: `2 + floor(winner_xp / 20)`.
pub fn acorns_stolen(winner_xp_gained: u64) -> u64 {
    BASE_ACORNS_STOLEN + winner_xp_gained / XP_PER_STOLEN_ACORN
}

/// Resolve a battle between `attacker` and `defender`.
///
/// The attacker wins only with strictly greater power; ties go to the
/// defender. Both sides gain XP. The winner receives the full stolen amount
/// while the loser's balance is floored at zero.
pub fn resolve_battle(
    attacker: &BattleSnapshot,
    defender: &BattleSnapshot,
    rolls: PowerRolls,
) -> BattleOutcome {
    let attacker_power = power(attacker, rolls.attacker);
    let defender_power = power(defender, rolls.defender);
    let attacker_won = attacker_power > defender_power;

    let attacker_xp_gained = xp_reward(defender.level(), attacker_won);
    let defender_xp_gained = xp_reward(attacker.level(), !attacker_won);

    let winner_xp_gained = if attacker_won {
        attacker_xp_gained
    } else {
        defender_xp_gained
    };
    let stolen = acorns_stolen(winner_xp_gained);

    BattleOutcome {
        attacker_won,
        attacker_power,
        defender_power,
        acorns_stolen: stolen,
        attacker: settle_side(attacker, attacker_xp_gained, attacker_won, stolen),
        defender: settle_side(defender, defender_xp_gained, !attacker_won, stolen),
    }
}

fn settle_side(snapshot: &BattleSnapshot, xp_gained: u64, won: bool, stolen: u64) -> SideOutcome {
    let new_xp = snapshot.xp.saturating_add(xp_gained);
    let new_acorns = if won {
        snapshot.acorns.saturating_add(stolen)
    } else {
        snapshot.acorns.saturating_sub(stolen)
    };
    let acorns_change = if won {
        i64::try_from(new_acorns - snapshot.acorns).unwrap_or(i64::MAX)
    } else {
        i64::try_from(snapshot.acorns - new_acorns)
            .map(|debit| -debit)
            .unwrap_or(i64::MIN)
    };

    SideOutcome {
        xp_gained,
        acorns_change,
        new_xp,
        new_level: level_of(new_xp),
        new_acorns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_level_attacker_wins_with_zero_rolls() {
        let attacker = BattleSnapshot::new(150, 40);
        let defender = BattleSnapshot::new(50, 30);

        let outcome = resolve_battle(&attacker, &defender, PowerRolls::new(0, 0));

        assert_eq!(outcome.attacker_power, 350);
        assert_eq!(outcome.defender_power, 150);
        assert!(outcome.attacker_won);
        assert_eq!(outcome.winner(), BattleSide::Attacker);

        assert_eq!(outcome.attacker.xp_gained, 60);
        assert_eq!(outcome.defender.xp_gained, 30);
        assert_eq!(outcome.acorns_stolen, 5);

        assert_eq!(outcome.attacker.new_acorns, 45);
        assert_eq!(outcome.attacker.acorns_change, 5);
        assert_eq!(outcome.defender.new_acorns, 25);
        assert_eq!(outcome.defender.acorns_change, -5);

        assert_eq!(outcome.attacker.new_xp, 210);
        assert_eq!(outcome.attacker.new_level, 3);
        assert_eq!(outcome.defender.new_xp, 80);
        assert_eq!(outcome.defender.new_level, 1);
    }

    #[test]
    fn tie_goes_to_defender() {
        let attacker = BattleSnapshot::new(120, 10);
        let defender = BattleSnapshot::new(120, 10);

        let outcome = resolve_battle(&attacker, &defender, PowerRolls::new(77, 77));

        assert_eq!(outcome.attacker_power, outcome.defender_power);
        assert!(!outcome.attacker_won);
        assert_eq!(outcome.winner(), BattleSide::Defender);
        // Defender wins against a level 2 attacker: 50 + 2*10
        assert_eq!(outcome.defender.xp_gained, 70);
        assert_eq!(outcome.attacker.xp_gained, 30);
        assert_eq!(outcome.acorns_stolen, 2 + 70 / 20);
    }

    #[test]
    fn roll_can_overturn_level_advantage() {
        let attacker = BattleSnapshot::new(0, 10);
        let defender = BattleSnapshot::new(100, 10);

        // 100 + 0 + 200 = 300 vs 200 + 100 + 0 = 300 -> tie, defender
        let tie = resolve_battle(&attacker, &defender, PowerRolls::new(200, 0));
        assert!(!tie.attacker_won);

        let attacker = BattleSnapshot::new(1, 10);
        let upset = resolve_battle(&attacker, &defender, PowerRolls::new(200, 0));
        assert!(upset.attacker_won);
    }

    #[test]
    fn rolls_above_max_are_clamped() {
        let snapshot = BattleSnapshot::new(0, 0);
        assert_eq!(power(&snapshot, 10_000), 100 + u64::from(ROLL_MAX));
    }

    #[test]
    fn loser_balance_is_floored_at_zero() {
        let attacker = BattleSnapshot::new(500, 0);
        let defender = BattleSnapshot::new(0, 3);

        let outcome = resolve_battle(&attacker, &defender, PowerRolls::new(0, 200));

        assert!(outcome.attacker_won);
        assert!(outcome.acorns_stolen > 3);
        assert_eq!(outcome.defender.new_acorns, 0);
        assert_eq!(outcome.defender.acorns_change, -3);
        // Winner still receives the full stolen amount
        assert_eq!(outcome.attacker.new_acorns, outcome.acorns_stolen);
    }

    #[test]
    fn exactly_one_winner_and_both_gain_xp() {
        for attacker_roll in (0..=ROLL_MAX).step_by(25) {
            for defender_roll in (0..=ROLL_MAX).step_by(25) {
                let attacker = BattleSnapshot::new(230, 12);
                let defender = BattleSnapshot::new(310, 1);
                let outcome = resolve_battle(
                    &attacker,
                    &defender,
                    PowerRolls::new(attacker_roll, defender_roll),
                );

                assert_eq!(
                    outcome.attacker_won,
                    outcome.attacker_power > outcome.defender_power
                );
                assert!(outcome.attacker.xp_gained > 0);
                assert!(outcome.defender.xp_gained > 0);
                let winner = outcome.side(outcome.winner());
                assert_eq!(winner.acorns_change, outcome.acorns_stolen as i64);
            }
        }
    }

    #[test]
    fn xp_reward_formulas() {
        assert_eq!(xp_reward(1, true), 60);
        assert_eq!(xp_reward(3, true), 80);
        assert_eq!(xp_reward(2, false), 30);
        assert_eq!(acorns_stolen(60), 5);
        assert_eq!(acorns_stolen(19), 2);
    }
}
