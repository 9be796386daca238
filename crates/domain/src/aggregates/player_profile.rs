//! PlayerProfile aggregate - one per player, owner of all progression state.
//!
//! # Invariants
//!
//! - `level()` is always `floor(xp / 100) + 1`; there is no level field
//! - `acorns` never goes below zero (debits saturate)
//! - `xp` only decreases through an explicit attendance revocation
//! - a ledger key is paid at most once while it is in `completed_reward_ids`
//! - `attendance_streak` equals the streak replayed over `attendance_log`

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::economy::{
    calculate_attendance, gates, level_of, xp_into_level, AttendanceStreak, BattleSide,
    BattleSnapshot, BattleStatus, LevelChange, SideOutcome,
};
use crate::error::DomainError;
use crate::events::{
    AttendanceEntry, AttendanceOutcome, AttendanceRevoked, ClaimOutcome, RewardGrant,
};
use crate::ids::PlayerId;
use crate::value_objects::{DisplayName, RewardKey};

/// Acorns granted to every new player.
pub const STARTING_ACORNS: u64 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    // Identity
    id: PlayerId,
    display_name: DisplayName,

    // Balances
    xp: u64,
    acorns: u64,

    // Temporal gates
    last_battle_time: Option<DateTime<Utc>>,
    shield_end_time: Option<DateTime<Utc>>,

    // Claim ledger
    completed_reward_ids: BTreeSet<RewardKey>,

    // Attendance
    attendance_streak: AttendanceStreak,
    attendance_log: Vec<AttendanceEntry>,

    // Metadata
    created_at: DateTime<Utc>,
}

impl PlayerProfile {
    // =========================================================================
    // Constructor
    // =========================================================================

    /// Create the profile a player gets at first login: level 1, 0 XP and
    /// the starting acorn grant.
    pub fn new(id: PlayerId, display_name: DisplayName, now: DateTime<Utc>) -> Self {
        Self {
            id,
            display_name,
            xp: 0,
            acorns: STARTING_ACORNS,
            last_battle_time: None,
            shield_end_time: None,
            completed_reward_ids: BTreeSet::new(),
            attendance_streak: AttendanceStreak::default(),
            attendance_log: Vec::new(),
            created_at: now,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn id(&self) -> &PlayerId {
        &self.id
    }

    #[inline]
    pub fn display_name(&self) -> &DisplayName {
        &self.display_name
    }

    #[inline]
    pub fn xp(&self) -> u64 {
        self.xp
    }

    /// Derived from `xp`, never stored.
    #[inline]
    pub fn level(&self) -> u32 {
        level_of(self.xp)
    }

    #[inline]
    pub fn xp_into_level(&self) -> u64 {
        xp_into_level(self.xp)
    }

    #[inline]
    pub fn acorns(&self) -> u64 {
        self.acorns
    }

    #[inline]
    pub fn last_battle_time(&self) -> Option<DateTime<Utc>> {
        self.last_battle_time
    }

    #[inline]
    pub fn shield_end_time(&self) -> Option<DateTime<Utc>> {
        self.shield_end_time
    }

    pub fn completed_reward_ids(&self) -> &BTreeSet<RewardKey> {
        &self.completed_reward_ids
    }

    pub fn has_claimed(&self, key: &RewardKey) -> bool {
        self.completed_reward_ids.contains(key)
    }

    #[inline]
    pub fn attendance_streak(&self) -> &AttendanceStreak {
        &self.attendance_streak
    }

    pub fn attendance_log(&self) -> &[AttendanceEntry] {
        &self.attendance_log
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // =========================================================================
    // Temporal Gates
    // =========================================================================

    pub fn can_battle(&self, now: DateTime<Utc>) -> bool {
        gates::can_battle(self.last_battle_time, now)
    }

    pub fn is_shielded(&self, now: DateTime<Utc>) -> bool {
        gates::is_shielded(self.shield_end_time, now)
    }

    pub fn battle_status(&self, now: DateTime<Utc>) -> BattleStatus {
        BattleStatus::evaluate(self.last_battle_time, self.shield_end_time, now)
    }

    pub fn battle_snapshot(&self) -> BattleSnapshot {
        BattleSnapshot::new(self.xp, self.acorns)
    }

    // =========================================================================
    // Builder Methods (used when seeding or in tests)
    // =========================================================================

    pub fn with_xp(mut self, xp: u64) -> Self {
        self.xp = xp;
        self
    }

    pub fn with_acorns(mut self, acorns: u64) -> Self {
        self.acorns = acorns;
        self
    }

    pub fn with_last_battle_time(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.last_battle_time = at;
        self
    }

    pub fn with_shield_end_time(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.shield_end_time = at;
        self
    }

    // =========================================================================
    // Mutation Methods
    // =========================================================================

    /// Apply one side of a resolved battle.
    ///
    /// The attacker starts its cooldown. The defender always receives a fresh
    /// shield, whether it won or lost.
    pub fn apply_battle(
        &mut self,
        side: BattleSide,
        outcome: &SideOutcome,
        now: DateTime<Utc>,
    ) -> LevelChange {
        let change = LevelChange::between(self.xp, outcome.new_xp);
        self.xp = outcome.new_xp;
        self.acorns = outcome.new_acorns;

        match side {
            BattleSide::Attacker => self.last_battle_time = Some(now),
            BattleSide::Defender => self.shield_end_time = Some(now + gates::shield_duration()),
        }

        change
    }

    /// Pay `acorns`/`xp` for `key` unless it is already in the ledger.
    pub fn claim_reward(&mut self, key: RewardKey, acorns: u64, xp: u64) -> ClaimOutcome {
        if self.has_claimed(&key) {
            return ClaimOutcome::AlreadyClaimed;
        }
        self.completed_reward_ids.insert(key);
        ClaimOutcome::Granted(self.grant(acorns, xp))
    }

    /// Record attendance on `date` and pay the streak-scaled reward.
    ///
    /// Streak state, ledger entry and balances change together.
    pub fn claim_attendance(
        &mut self,
        date: NaiveDate,
        event_id: Option<&str>,
    ) -> Result<AttendanceOutcome, DomainError> {
        let key = RewardKey::attendance(date, event_id)?;
        if self.has_claimed(&key) {
            return Ok(AttendanceOutcome::AlreadyClaimed);
        }

        let already_attended = self.attendance_log.iter().any(|entry| entry.date == date);
        let (streak, reward) =
            calculate_attendance(&self.attendance_streak, date, already_attended);
        self.attendance_streak = streak;
        self.attendance_log.push(AttendanceEntry {
            key: key.clone(),
            date,
            acorns: reward.acorns,
            xp: reward.xp,
        });
        self.completed_reward_ids.insert(key);
        let grant = self.grant(reward.acorns, reward.xp);

        Ok(AttendanceOutcome::Paid {
            reward,
            level_change: grant.level_change,
            streak,
        })
    }

    /// Undo one attendance claim.
    ///
    /// Removes exactly what that claim paid (floored at zero) and rebuilds the
    /// streak from the remaining claims in their original order. Later claims
    /// keep the multiplier they were paid at.
    pub fn revoke_attendance(
        &mut self,
        date: NaiveDate,
        event_id: Option<&str>,
    ) -> Result<AttendanceRevoked, DomainError> {
        let key = RewardKey::attendance(date, event_id)?;
        let position = self
            .attendance_log
            .iter()
            .position(|entry| entry.key == key)
            .ok_or_else(|| DomainError::not_found("AttendanceClaim", key.as_str()))?;

        let entry = self.attendance_log.remove(position);
        self.completed_reward_ids.remove(&entry.key);

        let xp_before = self.xp;
        let acorns_removed = entry.acorns.min(self.acorns);
        let xp_removed = entry.xp.min(self.xp);
        self.acorns -= acorns_removed;
        self.xp -= xp_removed;

        self.attendance_streak =
            AttendanceStreak::replay(self.attendance_log.iter().map(|e| e.date));

        Ok(AttendanceRevoked {
            key: entry.key,
            acorns_removed,
            xp_removed,
            level_change: LevelChange::between(xp_before, self.xp),
            streak: self.attendance_streak,
        })
    }

    fn grant(&mut self, acorns: u64, xp: u64) -> RewardGrant {
        let xp_before = self.xp;
        self.xp = self.xp.saturating_add(xp);
        self.acorns = self.acorns.saturating_add(acorns);
        RewardGrant {
            acorns,
            xp,
            level_change: LevelChange::between(xp_before, self.xp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::{resolve_battle, PowerRolls};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 2, 10, 0, 0).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, d).unwrap()
    }

    fn profile(id: &str) -> PlayerProfile {
        PlayerProfile::new(
            PlayerId::new(id).unwrap(),
            DisplayName::new(id).unwrap(),
            now(),
        )
    }

    #[test]
    fn new_profile_has_starting_values() {
        let p = profile("alice");
        assert_eq!(p.level(), 1);
        assert_eq!(p.xp(), 0);
        assert_eq!(p.acorns(), STARTING_ACORNS);
        assert!(p.last_battle_time().is_none());
        assert!(p.shield_end_time().is_none());
        assert!(p.completed_reward_ids().is_empty());
        assert!(p.can_battle(now()));
        assert!(!p.is_shielded(now()));
    }

    #[test]
    fn claim_reward_pays_once() {
        let mut p = profile("alice");
        let key = RewardKey::assignment("101", "7").unwrap();

        let first = p.claim_reward(key.clone(), 10, 120);
        match first {
            ClaimOutcome::Granted(grant) => {
                assert_eq!(grant.level_change.new_level(), Some(2));
            }
            ClaimOutcome::AlreadyClaimed => panic!("first claim must pay"),
        }
        assert_eq!((p.acorns(), p.xp(), p.level()), (60, 120, 2));

        let second = p.claim_reward(key, 10, 120);
        assert_eq!(second, ClaimOutcome::AlreadyClaimed);
        assert_eq!((p.acorns(), p.xp()), (60, 120));
    }

    #[test]
    fn battle_sets_cooldown_and_shield() {
        let mut attacker = profile("attacker").with_xp(150).with_acorns(10);
        let mut defender = profile("defender").with_xp(50).with_acorns(3);

        let outcome = resolve_battle(
            &attacker.battle_snapshot(),
            &defender.battle_snapshot(),
            PowerRolls::new(0, 0),
        );
        attacker.apply_battle(BattleSide::Attacker, &outcome.attacker, now());
        defender.apply_battle(BattleSide::Defender, &outcome.defender, now());

        assert_eq!(attacker.xp(), 210);
        assert_eq!(attacker.acorns(), 15);
        assert_eq!(attacker.last_battle_time(), Some(now()));
        assert!(attacker.shield_end_time().is_none());
        assert!(!attacker.can_battle(now() + Duration::hours(7)));

        assert_eq!(defender.xp(), 80);
        assert_eq!(defender.acorns(), 0);
        assert_eq!(defender.shield_end_time(), Some(now() + Duration::hours(8)));
        assert!(defender.last_battle_time().is_none());
        assert!(defender.is_shielded(now()));
    }

    #[test]
    fn defender_is_shielded_even_when_winning() {
        let mut attacker = profile("attacker");
        let mut defender = profile("defender").with_xp(900);

        let outcome = resolve_battle(
            &attacker.battle_snapshot(),
            &defender.battle_snapshot(),
            PowerRolls::new(0, 0),
        );
        assert!(!outcome.attacker_won);
        attacker.apply_battle(BattleSide::Attacker, &outcome.attacker, now());
        defender.apply_battle(BattleSide::Defender, &outcome.defender, now());

        assert!(defender.is_shielded(now()));
    }

    #[test]
    fn attendance_builds_streak_and_dedupes() {
        let mut p = profile("alice");

        for d in 1..=3 {
            let outcome = p.claim_attendance(day(d), None).unwrap();
            assert!(matches!(outcome, AttendanceOutcome::Paid { .. }));
        }
        assert_eq!(p.attendance_streak().current_streak, 3);
        assert_eq!(p.acorns(), STARTING_ACORNS + 5 + 5 + 6);
        assert_eq!(p.xp(), 10 + 10 + 12);

        let repeat = p.claim_attendance(day(3), None).unwrap();
        assert_eq!(repeat, AttendanceOutcome::AlreadyClaimed);
        assert_eq!(p.xp(), 32);
    }

    #[test]
    fn second_class_same_day_pays_without_advancing_streak() {
        let mut p = profile("alice");
        p.claim_attendance(day(1), Some("math")).unwrap();
        let outcome = p.claim_attendance(day(1), Some("bio")).unwrap();

        match outcome {
            AttendanceOutcome::Paid { streak, reward, .. } => {
                assert_eq!(streak.current_streak, 1);
                assert_eq!(streak.total_days_attended, 1);
                assert_eq!(reward.acorns, 5);
            }
            AttendanceOutcome::AlreadyClaimed => panic!("different class must pay"),
        }
    }

    #[test]
    fn late_claim_for_earlier_day_keeps_streak() {
        let mut p = profile("alice");
        p.claim_attendance(day(10), Some("math")).unwrap();
        p.claim_attendance(day(11), Some("math")).unwrap();
        let outcome = p.claim_attendance(day(10), Some("bio")).unwrap();

        match outcome {
            AttendanceOutcome::Paid { streak, reward, .. } => {
                assert_eq!(streak.current_streak, 2);
                assert_eq!(streak.total_days_attended, 2);
                assert_eq!(streak.last_attendance_date, Some(day(11)));
                assert_eq!((reward.acorns, reward.xp), (5, 10));
            }
            AttendanceOutcome::AlreadyClaimed => panic!("different class must pay"),
        }

        // Revoking the newest day replays 10, 10 as a single day.
        p.revoke_attendance(day(11), Some("math")).unwrap();
        assert_eq!(p.attendance_streak().current_streak, 1);
        assert_eq!(p.attendance_streak().total_days_attended, 1);
        assert_eq!(p.attendance_streak().last_attendance_date, Some(day(10)));
    }

    #[test]
    fn revoke_latest_restores_balances_and_streak() {
        let mut p = profile("alice");
        for d in 1..=3 {
            p.claim_attendance(day(d), None).unwrap();
        }

        let revoked = p.revoke_attendance(day(3), None).unwrap();
        assert_eq!(revoked.acorns_removed, 6);
        assert_eq!(revoked.xp_removed, 12);
        assert_eq!(revoked.streak.current_streak, 2);
        assert_eq!(p.acorns(), STARTING_ACORNS + 10);
        assert_eq!(p.xp(), 20);
        assert!(!p.has_claimed(&RewardKey::attendance(day(3), None).unwrap()));

        // Re-claiming after revocation pays again at the rebuilt streak
        let again = p.claim_attendance(day(3), None).unwrap();
        assert!(matches!(again, AttendanceOutcome::Paid { .. }));
        assert_eq!(p.attendance_streak().current_streak, 3);
    }

    #[test]
    fn revoke_middle_day_recomputes_streak_exactly() {
        let mut p = profile("alice");
        for d in 1..=4 {
            p.claim_attendance(day(d), None).unwrap();
        }
        p.revoke_attendance(day(2), None).unwrap();

        // Remaining claims: 1, 3, 4 -> streak restarts on day 3
        assert_eq!(p.attendance_streak().current_streak, 2);
        assert_eq!(p.attendance_streak().total_days_attended, 3);
        assert_eq!(p.attendance_streak().last_attendance_date, Some(day(4)));
    }

    #[test]
    fn revoke_is_floored_at_zero() {
        let mut p = profile("alice").with_acorns(0);
        p.claim_attendance(day(1), None).unwrap();
        // Three of the five acorns were lost in a battle since
        let mut p = p.with_acorns(2);

        let revoked = p.revoke_attendance(day(1), None).unwrap();
        assert_eq!(revoked.acorns_removed, 2);
        assert_eq!(p.acorns(), 0);
    }

    #[test]
    fn revoke_unknown_claim_fails() {
        let mut p = profile("alice");
        let err = p.revoke_attendance(day(1), None).unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[test]
    fn serde_round_trip_keeps_ledger() {
        let mut p = profile("alice");
        p.claim_attendance(day(1), Some("cs101")).unwrap();
        let json = serde_json::to_string(&p).unwrap();
        let back: PlayerProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
        assert!(!json.contains("\"level\""));
    }
}
