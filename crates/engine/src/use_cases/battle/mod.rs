//! Battle use cases.

mod initiate;
mod status;

pub use initiate::{BattleReport, InitiateBattle, OpponentSummary};
pub use status::{BattleHistory, GetBattleStatus};

use std::sync::Arc;

use crate::infrastructure::ports::RepoError;
use crate::use_cases::retry::ConflictAware;

/// Container for battle use cases.
pub struct BattleUseCases {
    pub initiate: Arc<InitiateBattle>,
    pub status: Arc<GetBattleStatus>,
    pub history: Arc<BattleHistory>,
}

impl BattleUseCases {
    pub fn new(
        initiate: Arc<InitiateBattle>,
        status: Arc<GetBattleStatus>,
        history: Arc<BattleHistory>,
    ) -> Self {
        Self {
            initiate,
            status,
            history,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BattleError {
    #[error("Player not found: {0}")]
    PlayerNotFound(String),
    #[error("Battle cooldown active, next battle in {remaining_secs}s")]
    NotEligible { remaining_secs: i64 },
    #[error("No opponent available")]
    NoOpponentAvailable,
    #[error("Battle settlement kept conflicting with concurrent updates")]
    Conflict,
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<RepoError> for BattleError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict { .. } => Self::Conflict,
            RepoError::NotFound { id, .. } => Self::PlayerNotFound(id),
            other => Self::StorageUnavailable(other.to_string()),
        }
    }
}

impl ConflictAware for BattleError {
    fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict)
    }
}
