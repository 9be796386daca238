//! Reward use cases.
//!
//! Every payout goes through the player's claim ledger: the key is inserted
//! and the balances credited in the same conditional commit, so a redundant
//! completion signal can never pay twice.

mod assignment;
mod attendance;
mod ledger;

pub use assignment::ClaimAssignmentReward;
pub use attendance::{
    AttendanceReward, AttendanceRevocation, ClaimAttendanceReward, RevokeAttendanceReward,
};
pub use ledger::{ClaimReward, RewardResult};

use std::sync::Arc;

use acornquest_domain::DomainError;

use crate::infrastructure::ports::RepoError;
use crate::use_cases::retry::ConflictAware;

/// Container for reward use cases.
pub struct RewardUseCases {
    pub attendance: Arc<ClaimAttendanceReward>,
    pub revoke_attendance: Arc<RevokeAttendanceReward>,
    pub assignment: Arc<ClaimAssignmentReward>,
}

impl RewardUseCases {
    pub fn new(
        attendance: Arc<ClaimAttendanceReward>,
        revoke_attendance: Arc<RevokeAttendanceReward>,
        assignment: Arc<ClaimAssignmentReward>,
    ) -> Self {
        Self {
            attendance,
            revoke_attendance,
            assignment,
        }
    }
}

/// Result of a ledger claim. A repeat is a success, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimResult<T> {
    Claimed(T),
    AlreadyClaimed,
}

impl<T> ClaimResult<T> {
    pub fn is_claimed(&self) -> bool {
        matches!(self, Self::Claimed(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RewardError {
    #[error("Player not found: {0}")]
    PlayerNotFound(String),
    #[error("Assignment {assignment_id} in course {course_id} is not complete")]
    AssignmentIncomplete {
        course_id: String,
        assignment_id: String,
    },
    #[error("Course data unavailable: {0}")]
    CourseDataUnavailable(String),
    #[error("Cannot revoke: {0}")]
    RevokeNotAllowed(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Reward kept conflicting with concurrent updates")]
    Conflict,
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<RepoError> for RewardError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict { .. } => Self::Conflict,
            RepoError::NotFound { id, .. } => Self::PlayerNotFound(id),
            other => Self::StorageUnavailable(other.to_string()),
        }
    }
}

impl From<DomainError> for RewardError {
    fn from(e: DomainError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl ConflictAware for RewardError {
    fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict)
    }
}
