//! Claim ledger keys.
//!
//! A ledger key identifies one external completion event. Paying a reward
//! inserts its key into the player's ledger, so "already paid" is a single
//! set-membership test.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

const MAX_COMPONENT_LENGTH: usize = 100;
const ATTENDANCE_PREFIX: &str = "attendance";
const ASSIGNMENT_PREFIX: &str = "assignment";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    Attendance,
    Assignment,
    Other,
}

/// Opaque, validated claim ledger key (e.g. `attendance:2024-09-02:cs101`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RewardKey(String);

impl RewardKey {
    /// Wrap an arbitrary external event id.
    pub fn new(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("Reward key cannot be empty"));
        }
        if trimmed.len() > MAX_COMPONENT_LENGTH * 3 {
            return Err(DomainError::validation("Reward key is too long"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Key for attending on `date`, optionally scoped to one calendar event
    /// so several classes on the same day can each be claimed once.
    pub fn attendance(date: NaiveDate, event_id: Option<&str>) -> Result<Self, DomainError> {
        let date = date.format("%Y-%m-%d");
        match event_id {
            None => Ok(Self(format!("{ATTENDANCE_PREFIX}:{date}"))),
            Some(event_id) => {
                let event_id = component("event id", event_id)?;
                Ok(Self(format!("{ATTENDANCE_PREFIX}:{date}:{event_id}")))
            }
        }
    }

    /// Key for completing one assignment of one course.
    pub fn assignment(course_id: &str, assignment_id: &str) -> Result<Self, DomainError> {
        let course_id = component("course id", course_id)?;
        let assignment_id = component("assignment id", assignment_id)?;
        Ok(Self(format!(
            "{ASSIGNMENT_PREFIX}:{course_id}:{assignment_id}"
        )))
    }

    pub fn kind(&self) -> RewardKind {
        match self.0.split(':').next() {
            Some(ATTENDANCE_PREFIX) => RewardKind::Attendance,
            Some(ASSIGNMENT_PREFIX) => RewardKind::Assignment,
            _ => RewardKind::Other,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Components are limited to ASCII letters, digits, `_` and `-`. The `:`
/// separator can never appear, and ids stay safe to use as URL path segments.
fn component<'a>(what: &str, value: &'a str) -> Result<&'a str, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{what} cannot be empty")));
    }
    if trimmed.len() > MAX_COMPONENT_LENGTH {
        return Err(DomainError::validation(format!(
            "{what} cannot exceed {MAX_COMPONENT_LENGTH} characters"
        )));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(DomainError::validation(format!(
            "{what} may only contain letters, digits, '_' and '-'"
        )));
    }
    Ok(trimmed)
}

impl fmt::Display for RewardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for RewardKey {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RewardKey> for String {
    fn from(key: RewardKey) -> String {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 2).unwrap()
    }

    #[test]
    fn attendance_keys() {
        let day = RewardKey::attendance(date(), None).unwrap();
        assert_eq!(day.as_str(), "attendance:2024-09-02");
        assert_eq!(day.kind(), RewardKind::Attendance);

        let class = RewardKey::attendance(date(), Some("cs101-lec")).unwrap();
        assert_eq!(class.as_str(), "attendance:2024-09-02:cs101-lec");
        assert_ne!(day, class);
    }

    #[test]
    fn assignment_keys() {
        let key = RewardKey::assignment("4411", "99812").unwrap();
        assert_eq!(key.as_str(), "assignment:4411:99812");
        assert_eq!(key.kind(), RewardKind::Assignment);
    }

    #[test]
    fn separator_in_components_is_rejected() {
        assert!(RewardKey::assignment("a:b", "c").is_err());
        assert!(RewardKey::assignment("a", "").is_err());
        assert!(RewardKey::attendance(date(), Some("x y")).is_err());
    }

    #[test]
    fn path_and_suffix_characters_are_rejected() {
        for crafted in ["7/submissions/bob#1", "../x", "7?x=1", "7#2", "7%2F8", "7.1"] {
            assert!(
                RewardKey::assignment("4411", crafted).is_err(),
                "{crafted} must be rejected"
            );
        }
        assert!(RewardKey::assignment("../4411", "7").is_err());
        assert!(RewardKey::attendance(date(), Some("cs101#2")).is_err());
        assert!(RewardKey::assignment("course_1", "quiz-7").is_ok());
    }

    #[test]
    fn raw_keys_are_other() {
        let key = RewardKey::new("bonus-week-1").unwrap();
        assert_eq!(key.kind(), RewardKind::Other);
        assert!(RewardKey::new("  ").is_err());
    }
}
