//! Attendance streak and reward calculator.
//!
//! Multipliers are kept in tenths so rewards are computed with integer
//! arithmetic (`floor(base * multiplier)` without float rounding surprises).

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Acorns paid for one attendance at 1.0x.
pub const BASE_ACORNS: u64 = 5;
/// XP paid for one attendance at 1.0x.
pub const BASE_XP: u64 = 10;

/// One row of the streak multiplier table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakTier {
    pub min_streak: u32,
    pub multiplier_tenths: u64,
    pub label: &'static str,
}

impl StreakTier {
    pub fn multiplier(&self) -> f64 {
        self.multiplier_tenths as f64 / 10.0
    }

    /// `floor(base * multiplier)`.
    pub fn apply(&self, base: u64) -> u64 {
        base.saturating_mul(self.multiplier_tenths) / 10
    }
}

/// Ordered by ascending threshold.
pub const STREAK_TIERS: [StreakTier; 7] = [
    StreakTier { min_streak: 1, multiplier_tenths: 10, label: "First class!" },
    StreakTier { min_streak: 3, multiplier_tenths: 12, label: "3-day streak!" },
    StreakTier { min_streak: 5, multiplier_tenths: 15, label: "5-day streak!" },
    StreakTier { min_streak: 7, multiplier_tenths: 20, label: "Week streak!" },
    StreakTier { min_streak: 14, multiplier_tenths: 25, label: "2-week streak!" },
    StreakTier { min_streak: 21, multiplier_tenths: 30, label: "3-week streak!" },
    StreakTier { min_streak: 30, multiplier_tenths: 40, label: "Month streak!" },
];

/// Highest tier whose threshold `streak` meets (the first tier below 1).
pub fn tier_for(streak: u32) -> StreakTier {
    STREAK_TIERS
        .iter()
        .rev()
        .find(|tier| streak >= tier.min_streak)
        .copied()
        .unwrap_or(STREAK_TIERS[0])
}

/// Stored streak state for a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStreak {
    pub current_streak: u32,
    pub last_attendance_date: Option<NaiveDate>,
    pub total_days_attended: u32,
}

impl AttendanceStreak {
    /// Streak state after attending on `date`.
    ///
    /// - no previous date: 1
    /// - same calendar day: unchanged
    /// - the following calendar day: +1
    /// - anything else (gap, or a date before the last one): reset to 1
    pub fn advance(&self, date: NaiveDate) -> Self {
        let Some(prev) = self.last_attendance_date else {
            return Self {
                current_streak: 1,
                last_attendance_date: Some(date),
                total_days_attended: self.total_days_attended.saturating_add(1),
            };
        };

        let gap_days = (date - prev).num_days();
        let current_streak = match gap_days {
            0 => self.current_streak.max(1),
            1 => self.current_streak.saturating_add(1),
            _ => 1,
        };
        let total_days_attended = if gap_days == 0 {
            self.total_days_attended
        } else {
            self.total_days_attended.saturating_add(1)
        };

        Self {
            current_streak,
            last_attendance_date: Some(date),
            total_days_attended,
        }
    }

    /// Streak state after another claim for a day that was already attended
    /// (a second class, or a late signal). Nothing moves.
    pub fn revisit(&self) -> Self {
        Self {
            current_streak: self.current_streak.max(1),
            ..*self
        }
    }

    /// Rebuild a streak by replaying attendance dates in claim order.
    pub fn replay<I>(dates: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let mut attended = BTreeSet::new();
        dates.into_iter().fold(Self::default(), |streak, date| {
            if attended.insert(date) {
                streak.advance(date)
            } else {
                streak.revisit()
            }
        })
    }
}

/// Reward computed for one attendance claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRewardCalc {
    pub acorns: u64,
    pub xp: u64,
    pub base_acorns: u64,
    pub base_xp: u64,
    pub streak_multiplier: f64,
    pub streak_label: String,
    pub current_streak: u32,
}

impl AttendanceRewardCalc {
    pub fn for_streak(streak: u32) -> Self {
        let tier = tier_for(streak);
        Self {
            acorns: tier.apply(BASE_ACORNS),
            xp: tier.apply(BASE_XP),
            base_acorns: BASE_ACORNS,
            base_xp: BASE_XP,
            streak_multiplier: tier.multiplier(),
            streak_label: tier.label.to_string(),
            current_streak: streak,
        }
    }

    pub fn has_bonus(&self) -> bool {
        self.streak_multiplier > 1.0
    }
}

/// Pure attendance step: new streak state plus the reward it earns.
///
/// `already_attended` is true when `date` was claimed before; the streak and
/// day count then stay as they are.
pub fn calculate_attendance(
    previous: &AttendanceStreak,
    date: NaiveDate,
    already_attended: bool,
) -> (AttendanceStreak, AttendanceRewardCalc) {
    let next = if already_attended {
        previous.revisit()
    } else {
        previous.advance(date)
    };
    let reward = AttendanceRewardCalc::for_streak(next.current_streak);
    (next, reward)
}
