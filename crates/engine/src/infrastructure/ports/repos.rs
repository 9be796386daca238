//! Repository port traits for player state and settlement.
//!
//! Every mutation of a player goes through a compare-and-commit: callers read
//! a [`VersionedPlayer`], mutate the profile in memory and hand it back. The
//! store writes only if the stored version still matches, otherwise it returns
//! [`RepoError::Conflict`] and writes nothing.

use acornquest_domain::{BattleRecord, JournalEntry, PlayerId, PlayerProfile};
use async_trait::async_trait;

use super::error::RepoError;

/// A profile together with the store version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedPlayer {
    pub profile: PlayerProfile,
    pub version: u64,
}

impl VersionedPlayer {
    pub fn new(profile: PlayerProfile, version: u64) -> Self {
        Self { profile, version }
    }

    #[inline]
    pub fn id(&self) -> &PlayerId {
        self.profile.id()
    }
}

// =============================================================================
// Player Storage
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlayerRepo: Send + Sync {
    async fn get(&self, id: &PlayerId) -> Result<Option<VersionedPlayer>, RepoError>;

    /// Store a brand new profile at version 1.
    ///
    /// Returns `Conflict` if a profile with the same id already exists.
    async fn insert(&self, profile: &PlayerProfile) -> Result<VersionedPlayer, RepoError>;

    async fn list_all(&self) -> Result<Vec<VersionedPlayer>, RepoError>;

    /// Highest XP first, ties broken by id ascending.
    async fn top_by_xp(&self, limit: u32) -> Result<Vec<PlayerProfile>, RepoError>;
}

// =============================================================================
// Settlement (atomic multi-record commits)
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettlementRepo: Send + Sync {
    /// Write one mutated profile and its journal entry together.
    ///
    /// `player.version` must be the version the profile was read at. Returns
    /// the new version.
    async fn commit_reward(
        &self,
        player: &VersionedPlayer,
        entry: &JournalEntry,
    ) -> Result<u64, RepoError>;

    /// Write both combatants, the battle record and the journal entries as a
    /// single unit. Either everything lands or nothing does.
    async fn commit_battle(
        &self,
        attacker: &VersionedPlayer,
        defender: &VersionedPlayer,
        record: &BattleRecord,
        entries: &[JournalEntry],
    ) -> Result<(), RepoError>;
}

// =============================================================================
// Audit Trail
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditRepo: Send + Sync {
    /// Newest first.
    async fn journal_for_player(
        &self,
        id: &PlayerId,
        limit: u32,
    ) -> Result<Vec<JournalEntry>, RepoError>;

    /// Battles where the player was attacker or defender, newest first.
    async fn battles_for_player(
        &self,
        id: &PlayerId,
        limit: u32,
    ) -> Result<Vec<BattleRecord>, RepoError>;
}
