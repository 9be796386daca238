//! Timeout wrapper for any player store.
//!
//! Every call is bounded by `timeout`. A call that runs out of time becomes
//! `RepoError::Unavailable`, so no caller ever waits on storage indefinitely.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use acornquest_domain::{BattleRecord, JournalEntry, PlayerId, PlayerProfile};
use async_trait::async_trait;

use crate::infrastructure::ports::{
    AuditRepo, PlayerRepo, RepoError, SettlementRepo, VersionedPlayer,
};

pub struct BoundedStore<S> {
    inner: Arc<S>,
    timeout: Duration,
}

impl<S> BoundedStore<S> {
    pub fn new(inner: Arc<S>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T, RepoError>
    where
        F: Future<Output = Result<T, RepoError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    operation,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Storage call timed out"
                );
                Err(RepoError::unavailable(
                    operation,
                    format!("timed out after {}ms", self.timeout.as_millis()),
                ))
            }
        }
    }
}

#[async_trait]
impl<S: PlayerRepo> PlayerRepo for BoundedStore<S> {
    async fn get(&self, id: &PlayerId) -> Result<Option<VersionedPlayer>, RepoError> {
        self.bounded("get_player", self.inner.get(id)).await
    }

    async fn insert(&self, profile: &PlayerProfile) -> Result<VersionedPlayer, RepoError> {
        self.bounded("insert_player", self.inner.insert(profile))
            .await
    }

    async fn list_all(&self) -> Result<Vec<VersionedPlayer>, RepoError> {
        self.bounded("list_players", self.inner.list_all()).await
    }

    async fn top_by_xp(&self, limit: u32) -> Result<Vec<PlayerProfile>, RepoError> {
        self.bounded("top_players", self.inner.top_by_xp(limit))
            .await
    }
}

#[async_trait]
impl<S: SettlementRepo> SettlementRepo for BoundedStore<S> {
    async fn commit_reward(
        &self,
        player: &VersionedPlayer,
        entry: &JournalEntry,
    ) -> Result<u64, RepoError> {
        self.bounded("commit_reward", self.inner.commit_reward(player, entry))
            .await
    }

    async fn commit_battle(
        &self,
        attacker: &VersionedPlayer,
        defender: &VersionedPlayer,
        record: &BattleRecord,
        entries: &[JournalEntry],
    ) -> Result<(), RepoError> {
        self.bounded(
            "commit_battle",
            self.inner.commit_battle(attacker, defender, record, entries),
        )
        .await
    }
}

#[async_trait]
impl<S: AuditRepo> AuditRepo for BoundedStore<S> {
    async fn journal_for_player(
        &self,
        id: &PlayerId,
        limit: u32,
    ) -> Result<Vec<JournalEntry>, RepoError> {
        self.bounded("journal_for_player", self.inner.journal_for_player(id, limit))
            .await
    }

    async fn battles_for_player(
        &self,
        id: &PlayerId,
        limit: u32,
    ) -> Result<Vec<BattleRecord>, RepoError> {
        self.bounded("battles_for_player", self.inner.battles_for_player(id, limit))
            .await
    }
}
