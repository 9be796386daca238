//! In-memory player store.
//!
//! All state sits behind one `RwLock`, so a battle commit checks and writes
//! both players, the record and the journal rows under a single write guard.

use std::collections::HashMap;

use acornquest_domain::{BattleRecord, JournalEntry, PlayerId, PlayerProfile};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::infrastructure::ports::{
    AuditRepo, PlayerRepo, RepoError, SettlementRepo, VersionedPlayer,
};

#[derive(Default)]
struct State {
    players: HashMap<PlayerId, VersionedPlayer>,
    battles: Vec<BattleRecord>,
    journal: Vec<JournalEntry>,
}

impl State {
    fn check_version(&self, expected: &VersionedPlayer) -> Result<(), RepoError> {
        match self.players.get(expected.id()) {
            None => Err(RepoError::not_found("Player", expected.id())),
            Some(stored) if stored.version != expected.version => {
                Err(RepoError::conflict("Player", expected.id()))
            }
            Some(_) => Ok(()),
        }
    }

    fn store_next_version(&mut self, player: &VersionedPlayer) -> u64 {
        let version = player.version + 1;
        self.players.insert(
            player.id().clone(),
            VersionedPlayer::new(player.profile.clone(), version),
        );
        version
    }
}

/// Process-local store. Used for development and tests.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlayerRepo for InMemoryStore {
    async fn get(&self, id: &PlayerId) -> Result<Option<VersionedPlayer>, RepoError> {
        Ok(self.state.read().await.players.get(id).cloned())
    }

    async fn insert(&self, profile: &PlayerProfile) -> Result<VersionedPlayer, RepoError> {
        let mut state = self.state.write().await;
        if state.players.contains_key(profile.id()) {
            return Err(RepoError::conflict("Player", profile.id()));
        }
        let stored = VersionedPlayer::new(profile.clone(), 1);
        state.players.insert(profile.id().clone(), stored.clone());
        Ok(stored)
    }

    async fn list_all(&self) -> Result<Vec<VersionedPlayer>, RepoError> {
        let state = self.state.read().await;
        let mut players: Vec<VersionedPlayer> = state.players.values().cloned().collect();
        players.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(players)
    }

    async fn top_by_xp(&self, limit: u32) -> Result<Vec<PlayerProfile>, RepoError> {
        let state = self.state.read().await;
        let mut profiles: Vec<PlayerProfile> =
            state.players.values().map(|p| p.profile.clone()).collect();
        profiles.sort_by(|a, b| b.xp().cmp(&a.xp()).then_with(|| a.id().cmp(b.id())));
        profiles.truncate(limit as usize);
        Ok(profiles)
    }
}

#[async_trait]
impl SettlementRepo for InMemoryStore {
    async fn commit_reward(
        &self,
        player: &VersionedPlayer,
        entry: &JournalEntry,
    ) -> Result<u64, RepoError> {
        let mut state = self.state.write().await;
        state.check_version(player)?;
        let version = state.store_next_version(player);
        state.journal.push(entry.clone());
        Ok(version)
    }

    async fn commit_battle(
        &self,
        attacker: &VersionedPlayer,
        defender: &VersionedPlayer,
        record: &BattleRecord,
        entries: &[JournalEntry],
    ) -> Result<(), RepoError> {
        if attacker.id() == defender.id() {
            return Err(RepoError::constraint("A player cannot battle themselves"));
        }

        let mut state = self.state.write().await;
        // Validate both before touching either
        state.check_version(attacker)?;
        state.check_version(defender)?;

        state.store_next_version(attacker);
        state.store_next_version(defender);
        state.battles.push(record.clone());
        state.journal.extend(entries.iter().cloned());
        Ok(())
    }
}

#[async_trait]
impl AuditRepo for InMemoryStore {
    async fn journal_for_player(
        &self,
        id: &PlayerId,
        limit: u32,
    ) -> Result<Vec<JournalEntry>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .journal
            .iter()
            .rev()
            .filter(|entry| &entry.player_id == id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn battles_for_player(
        &self,
        id: &PlayerId,
        limit: u32,
    ) -> Result<Vec<BattleRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .battles
            .iter()
            .rev()
            .filter(|record| record.involves(id))
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acornquest_domain::{
        resolve_battle, BattleId, BattleSide, DisplayName, JournalEntryId, LevelChange,
        PowerRolls, RewardGrant, RewardKey,
    };
    use chrono::{TimeZone, Utc};

    fn profile(id: &str, xp: u64) -> PlayerProfile {
        let now = Utc.with_ymd_and_hms(2024, 9, 2, 12, 0, 0).unwrap();
        PlayerProfile::new(
            PlayerId::new(id).unwrap(),
            DisplayName::new(id).unwrap(),
            now,
        )
        .with_xp(xp)
    }

    #[tokio::test]
    async fn insert_rejects_duplicates() {
        let store = InMemoryStore::new();
        let stored = store.insert(&profile("alice", 0)).await.unwrap();
        assert_eq!(stored.version, 1);

        let err = store.insert(&profile("alice", 10)).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn stale_reward_commit_writes_nothing() {
        let store = InMemoryStore::new();
        let read = store.insert(&profile("alice", 0)).await.unwrap();

        let mut first = read.clone();
        first.profile = first.profile.with_acorns(99);
        let grant = RewardGrant {
            acorns: 49,
            xp: 0,
            level_change: LevelChange::between(0, 0),
        };
        let entry = JournalEntry::reward(
            JournalEntryId::new(),
            read.id().clone(),
            &RewardKey::new("bonus").unwrap(),
            &grant,
            Utc::now(),
        );
        assert_eq!(store.commit_reward(&first, &entry).await.unwrap(), 2);

        // Second writer computed from the same version 1
        let mut second = read.clone();
        second.profile = second.profile.with_acorns(7);
        let err = store.commit_reward(&second, &entry).await.unwrap_err();
        assert!(err.is_conflict());

        let stored = store.get(read.id()).await.unwrap().unwrap();
        assert_eq!(stored.profile.acorns(), 99);
        assert_eq!(stored.version, 2);
        assert_eq!(store.journal_for_player(read.id(), 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn battle_commit_is_all_or_nothing() {
        let store = InMemoryStore::new();
        let attacker = store.insert(&profile("alice", 150)).await.unwrap();
        let defender = store.insert(&profile("bob", 50)).await.unwrap();
        let now = Utc::now();

        let outcome = resolve_battle(
            &attacker.profile.battle_snapshot(),
            &defender.profile.battle_snapshot(),
            PowerRolls::default(),
        );
        let record = BattleRecord::new(
            BattleId::new(),
            &attacker.profile,
            &defender.profile,
            &outcome,
            now,
        );

        let mut attacker_after = attacker.clone();
        attacker_after
            .profile
            .apply_battle(BattleSide::Attacker, &outcome.attacker, now);
        let mut defender_after = defender.clone();
        defender_after
            .profile
            .apply_battle(BattleSide::Defender, &outcome.defender, now);
        // Defender was modified elsewhere in the meantime
        defender_after.version = 0;

        let err = store
            .commit_battle(&attacker_after, &defender_after, &record, &[])
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let stored_attacker = store.get(attacker.id()).await.unwrap().unwrap();
        assert_eq!(stored_attacker, attacker);
        assert!(store
            .battles_for_player(attacker.id(), 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn leaderboard_orders_by_xp_then_id() {
        let store = InMemoryStore::new();
        store.insert(&profile("carol", 300)).await.unwrap();
        store.insert(&profile("bob", 500)).await.unwrap();
        store.insert(&profile("alice", 300)).await.unwrap();

        let top: Vec<String> = store
            .top_by_xp(10)
            .await
            .unwrap()
            .iter()
            .map(|p| p.id().to_string())
            .collect();
        assert_eq!(top, vec!["bob", "alice", "carol"]);

        assert_eq!(store.top_by_xp(1).await.unwrap().len(), 1);
    }
}
