//! Player use cases.
//!
//! Profile creation at first login, profile views with derived level fields,
//! the per-player journal and the XP leaderboard.

use std::sync::Arc;

use acornquest_domain::{
    xp_needed_for_next_level, AttendanceStreak, BattleStatus, DisplayName, DomainError,
    JournalEntry, PlayerId, PlayerProfile,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::infrastructure::ports::{AuditRepo, ClockPort, PlayerRepo, RepoError};
use crate::use_cases::MAX_LIST_LIMIT;

/// Container for player use cases.
pub struct PlayerUseCases {
    pub profiles: Arc<PlayerProfiles>,
    pub journal: Arc<PlayerJournal>,
    pub leaderboard: Arc<Leaderboard>,
}

impl PlayerUseCases {
    pub fn new(
        profiles: Arc<PlayerProfiles>,
        journal: Arc<PlayerJournal>,
        leaderboard: Arc<Leaderboard>,
    ) -> Self {
        Self {
            profiles,
            journal,
            leaderboard,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Player not found: {0}")]
    PlayerNotFound(String),
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<RepoError> for PlayerError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound { id, .. } => Self::PlayerNotFound(id),
            other => Self::StorageUnavailable(other.to_string()),
        }
    }
}

impl From<DomainError> for PlayerError {
    fn from(e: DomainError) -> Self {
        Self::Validation(e.to_string())
    }
}

// =============================================================================
// Views
// =============================================================================

/// Player profile as shown to clients. Level fields are derived from XP.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub display_name: String,
    pub level: u32,
    pub xp: u64,
    pub xp_into_level: u64,
    pub xp_needed_for_next_level: u64,
    pub acorns: u64,
    pub attendance_streak: AttendanceStreak,
    pub battle_status: BattleStatus,
    pub created_at: DateTime<Utc>,
}

impl PlayerView {
    pub fn from_profile(profile: &PlayerProfile, now: DateTime<Utc>) -> Self {
        Self {
            id: profile.id().clone(),
            display_name: profile.display_name().to_string(),
            level: profile.level(),
            xp: profile.xp(),
            xp_into_level: profile.xp_into_level(),
            xp_needed_for_next_level: xp_needed_for_next_level(),
            acorns: profile.acorns(),
            attendance_streak: *profile.attendance_streak(),
            battle_status: profile.battle_status(now),
            created_at: profile.created_at(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub player_id: PlayerId,
    pub display_name: String,
    pub level: u32,
    pub xp: u64,
}

// =============================================================================
// Profiles
// =============================================================================

/// Create and read player profiles.
pub struct PlayerProfiles {
    players: Arc<dyn PlayerRepo>,
    clock: Arc<dyn ClockPort>,
}

impl PlayerProfiles {
    pub fn new(players: Arc<dyn PlayerRepo>, clock: Arc<dyn ClockPort>) -> Self {
        Self { players, clock }
    }

    /// Create the profile on first login.
    ///
    /// Idempotent: an existing profile is returned unchanged, including when a
    /// concurrent login inserted it first.
    pub async fn create(&self, id: &str, display_name: &str) -> Result<PlayerView, PlayerError> {
        let id = PlayerId::new(id)?;
        let display_name = DisplayName::new(display_name)?;
        let now = self.clock.now();

        if let Some(existing) = self.players.get(&id).await? {
            return Ok(PlayerView::from_profile(&existing.profile, now));
        }

        let profile = PlayerProfile::new(id.clone(), display_name, now);
        match self.players.insert(&profile).await {
            Ok(stored) => {
                tracing::info!(player_id = %id, "Player created");
                Ok(PlayerView::from_profile(&stored.profile, now))
            }
            Err(RepoError::Conflict { .. }) => {
                tracing::debug!(player_id = %id, "Player created concurrently, returning it");
                let existing = self
                    .players
                    .get(&id)
                    .await?
                    .ok_or_else(|| PlayerError::PlayerNotFound(id.to_string()))?;
                Ok(PlayerView::from_profile(&existing.profile, now))
            }
            Err(e) => {
                tracing::error!(player_id = %id, error = %e, "Player creation failed");
                Err(e.into())
            }
        }
    }

    pub async fn get(&self, id: &PlayerId) -> Result<PlayerView, PlayerError> {
        let player = self
            .players
            .get(id)
            .await?
            .ok_or_else(|| PlayerError::PlayerNotFound(id.to_string()))?;
        Ok(PlayerView::from_profile(&player.profile, self.clock.now()))
    }
}

// =============================================================================
// Journal
// =============================================================================

pub struct PlayerJournal {
    players: Arc<dyn PlayerRepo>,
    audit: Arc<dyn AuditRepo>,
}

impl PlayerJournal {
    pub fn new(players: Arc<dyn PlayerRepo>, audit: Arc<dyn AuditRepo>) -> Self {
        Self { players, audit }
    }

    /// Newest first.
    pub async fn execute(
        &self,
        id: &PlayerId,
        limit: u32,
    ) -> Result<Vec<JournalEntry>, PlayerError> {
        if self.players.get(id).await?.is_none() {
            return Err(PlayerError::PlayerNotFound(id.to_string()));
        }
        Ok(self
            .audit
            .journal_for_player(id, limit.min(MAX_LIST_LIMIT))
            .await?)
    }
}

// =============================================================================
// Leaderboard
// =============================================================================

pub struct Leaderboard {
    players: Arc<dyn PlayerRepo>,
}

impl Leaderboard {
    pub fn new(players: Arc<dyn PlayerRepo>) -> Self {
        Self { players }
    }

    pub async fn execute(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, PlayerError> {
        let top = self.players.top_by_xp(limit.min(MAX_LIST_LIMIT)).await?;
        Ok(top
            .iter()
            .zip(1u32..)
            .map(|(profile, rank)| LeaderboardEntry {
                rank,
                player_id: profile.id().clone(),
                display_name: profile.display_name().to_string(),
                level: profile.level(),
                xp: profile.xp(),
            })
            .collect())
    }
}
