//! Course data providers.
//!
//! `CanvasClient` asks the Canvas LMS REST API whether a student has turned in
//! an assignment. `StaticCourseData` answers from an in-process set and is used
//! when Canvas is not configured.

use std::collections::HashSet;
use std::time::Duration;

use acornquest_domain::PlayerId;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::infrastructure::ports::{CourseDataError, CourseDataPort};

/// Submission states that count as "turned in".
const COMPLETE_STATES: &[&str] = &["submitted", "graded", "pending_review"];

/// Client for the Canvas LMS submissions API.
#[derive(Clone)]
pub struct CanvasClient {
    client: Client,
    base_url: String,
    api_token: String,
}

impl CanvasClient {
    pub fn new(base_url: &str, api_token: &str) -> Self {
        Self::with_timeout(base_url, api_token, Duration::from_secs(10))
    }

    pub fn with_timeout(base_url: &str, api_token: &str, timeout: Duration) -> Self {
        let client = match Client::builder().timeout(timeout).build() {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    timeout_ms = timeout.as_millis() as u64,
                    "Canvas client build failed, using default client without timeout"
                );
                Client::new()
            }
        };

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
        }
    }

    /// Ids are pushed as path segments, so `/`, `?` and `#` inside an id are
    /// percent-encoded and cannot reach another resource.
    fn submission_url(
        &self,
        course_id: &str,
        assignment_id: &str,
        user_id: &str,
    ) -> Result<Url, CourseDataError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            CourseDataError::Unavailable(format!("Invalid Canvas base URL: {e}"))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                CourseDataError::Unavailable(format!(
                    "Canvas base URL cannot hold a path: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend([
                "api",
                "v1",
                "courses",
                course_id,
                "assignments",
                assignment_id,
                "submissions",
                user_id,
            ]);
        Ok(url)
    }
}

/// The fields of a Canvas submission object the engine cares about.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CanvasSubmission {
    #[serde(default)]
    pub workflow_state: String,
    #[serde(default)]
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub missing: bool,
    #[serde(default)]
    pub excused: bool,
}

impl CanvasSubmission {
    /// Turned in and not flagged missing. An excused assignment with nothing
    /// submitted does not count.
    pub fn is_complete(&self) -> bool {
        if self.missing {
            return false;
        }
        if self.excused && self.submitted_at.is_none() {
            return false;
        }
        COMPLETE_STATES.contains(&self.workflow_state.as_str())
    }
}

#[async_trait]
impl CourseDataPort for CanvasClient {
    async fn is_assignment_complete(
        &self,
        player_id: &PlayerId,
        course_id: &str,
        assignment_id: &str,
    ) -> Result<bool, CourseDataError> {
        let url = self.submission_url(course_id, assignment_id, player_id.as_str())?;

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| CourseDataError::Unavailable(e.to_string()))?;

        // No submission record at all
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(
                player_id = %player_id,
                course_id,
                assignment_id,
                "Canvas has no submission"
            );
            return Ok(false);
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CourseDataError::Unavailable(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let submission: CanvasSubmission = response
            .json()
            .await
            .map_err(|e| CourseDataError::InvalidResponse(e.to_string()))?;

        Ok(submission.is_complete())
    }
}

/// In-process course data, keyed by `(player, course, assignment)`.
#[derive(Default)]
pub struct StaticCourseData {
    completed: RwLock<HashSet<(PlayerId, String, String)>>,
}

impl StaticCourseData {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn mark_complete(&self, player_id: &PlayerId, course_id: &str, assignment_id: &str) {
        self.completed.write().await.insert((
            player_id.clone(),
            course_id.to_string(),
            assignment_id.to_string(),
        ));
    }
}

#[async_trait]
impl CourseDataPort for StaticCourseData {
    async fn is_assignment_complete(
        &self,
        player_id: &PlayerId,
        course_id: &str,
        assignment_id: &str,
    ) -> Result<bool, CourseDataError> {
        let key = (
            player_id.clone(),
            course_id.to_string(),
            assignment_id.to_string(),
        );
        Ok(self.completed.read().await.contains(&key))
    }
}
