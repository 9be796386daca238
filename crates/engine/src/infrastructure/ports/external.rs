//! External service ports.

use acornquest_domain::PlayerId;
use async_trait::async_trait;

use super::error::CourseDataError;

/// Source of truth for "did this student complete this assignment".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseDataPort: Send + Sync {
    async fn is_assignment_complete(
        &self,
        player_id: &PlayerId,
        course_id: &str,
        assignment_id: &str,
    ) -> Result<bool, CourseDataError>;
}
