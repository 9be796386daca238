//! Assignment completion rewards.

use std::sync::Arc;

use acornquest_domain::{PlayerId, RewardKey};

use crate::infrastructure::config::AssignmentReward;
use crate::infrastructure::ports::{CourseDataPort, PlayerRepo};

use super::{ClaimResult, ClaimReward, RewardError, RewardResult};

/// Pay for a completed assignment, once.
///
/// Completion is confirmed with the course data provider on the server; the
/// client's own idea of what has been rewarded is never consulted.
pub struct ClaimAssignmentReward {
    players: Arc<dyn PlayerRepo>,
    course_data: Arc<dyn CourseDataPort>,
    ledger: Arc<ClaimReward>,
    reward: AssignmentReward,
}

impl ClaimAssignmentReward {
    pub fn new(
        players: Arc<dyn PlayerRepo>,
        course_data: Arc<dyn CourseDataPort>,
        ledger: Arc<ClaimReward>,
        reward: AssignmentReward,
    ) -> Self {
        Self {
            players,
            course_data,
            ledger,
            reward,
        }
    }

    pub async fn execute(
        &self,
        player_id: &PlayerId,
        course_id: &str,
        assignment_id: &str,
    ) -> Result<ClaimResult<RewardResult>, RewardError> {
        let key = RewardKey::assignment(course_id, assignment_id)?;

        // Already-paid keys skip the round trip to the course provider
        let player = self
            .players
            .get(player_id)
            .await?
            .ok_or_else(|| RewardError::PlayerNotFound(player_id.to_string()))?;
        if player.profile.has_claimed(&key) {
            return Ok(ClaimResult::AlreadyClaimed);
        }

        let complete = self
            .course_data
            .is_assignment_complete(player_id, course_id, assignment_id)
            .await
            .map_err(|e| {
                tracing::error!(
                    player_id = %player_id,
                    course_id,
                    assignment_id,
                    error = %e,
                    "Course data lookup failed"
                );
                RewardError::CourseDataUnavailable(e.to_string())
            })?;

        if !complete {
            tracing::warn!(
                player_id = %player_id,
                course_id,
                assignment_id,
                "Assignment claim rejected, not complete"
            );
            return Err(RewardError::AssignmentIncomplete {
                course_id: course_id.to_string(),
                assignment_id: assignment_id.to_string(),
            });
        }

        self.ledger
            .execute(player_id, &key, self.reward.acorns, self.reward.xp)
            .await
    }
}
