//! SQLite-backed player store.
//!
//! Profiles are stored as JSON next to a `version` column. Every settlement
//! runs inside one transaction whose `UPDATE ... WHERE id = ? AND version = ?`
//! statements must each hit exactly one row, otherwise the transaction is
//! dropped (rolled back) and `Conflict` is returned.

use std::str::FromStr;
use std::time::Duration;

use acornquest_domain::{BattleRecord, JournalEntry, PlayerId, PlayerProfile};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::infrastructure::ports::{
    AuditRepo, PlayerRepo, RepoError, SettlementRepo, VersionedPlayer,
};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS players (
        id TEXT PRIMARY KEY,
        version INTEGER NOT NULL,
        xp INTEGER NOT NULL,
        profile_json TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_players_xp ON players (xp DESC, id ASC)",
    r#"
    CREATE TABLE IF NOT EXISTS battles (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        attacker_id TEXT NOT NULL,
        defender_id TEXT NOT NULL,
        winner_id TEXT NOT NULL,
        record_json TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_battles_attacker ON battles (attacker_id)",
    "CREATE INDEX IF NOT EXISTS idx_battles_defender ON battles (defender_id)",
    r#"
    CREATE TABLE IF NOT EXISTS journal (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        player_id TEXT NOT NULL,
        kind TEXT NOT NULL,
        entry_json TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_journal_player ON journal (player_id)",
];

/// SQLite implementation of the player, settlement and audit ports.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn new(db_path: &str) -> Result<Self, RepoError> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", db_path))
            .map_err(|e| RepoError::database("connect", e))?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(sqlx_error("connect"))?;

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(sqlx_error("schema"))?;
        }

        tracing::info!(path = %db_path, "SQLite player store ready");
        Ok(Self { pool })
    }

    async fn update_versioned(
        tx: &mut Transaction<'_, Sqlite>,
        player: &VersionedPlayer,
        now: &str,
    ) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE players
            SET version = version + 1, xp = ?, profile_json = ?, updated_at = ?
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(to_i64(player.profile.xp())?)
        .bind(to_json(&player.profile)?)
        .bind(now)
        .bind(player.id().as_str())
        .bind(to_i64(player.version)?)
        .execute(&mut **tx)
        .await
        .map_err(sqlx_error("update_player"))?;

        if result.rows_affected() == 1 {
            Ok(())
        } else {
            Err(RepoError::conflict("Player", player.id()))
        }
    }

    async fn insert_journal(
        tx: &mut Transaction<'_, Sqlite>,
        entry: &JournalEntry,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO journal (id, player_id, kind, entry_json, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.player_id.as_str())
        .bind(entry.kind.as_str())
        .bind(to_json(entry)?)
        .bind(timestamp(entry.timestamp))
        .execute(&mut **tx)
        .await
        .map_err(sqlx_error("insert_journal"))?;
        Ok(())
    }
}

#[async_trait]
impl PlayerRepo for SqliteStore {
    async fn get(&self, id: &PlayerId) -> Result<Option<VersionedPlayer>, RepoError> {
        let row = sqlx::query("SELECT version, profile_json FROM players WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_error("get_player"))?;

        row.map(|row| versioned_from_row(&row)).transpose()
    }

    async fn insert(&self, profile: &PlayerProfile) -> Result<VersionedPlayer, RepoError> {
        let result = sqlx::query(
            r#"
            INSERT INTO players (id, version, xp, profile_json, updated_at)
            VALUES (?, 1, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(profile.id().as_str())
        .bind(to_i64(profile.xp())?)
        .bind(to_json(profile)?)
        .bind(timestamp(profile.created_at()))
        .execute(&self.pool)
        .await
        .map_err(sqlx_error("insert_player"))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::conflict("Player", profile.id()));
        }
        Ok(VersionedPlayer::new(profile.clone(), 1))
    }

    async fn list_all(&self) -> Result<Vec<VersionedPlayer>, RepoError> {
        let rows = sqlx::query("SELECT version, profile_json FROM players ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error("list_players"))?;

        rows.iter().map(versioned_from_row).collect()
    }

    async fn top_by_xp(&self, limit: u32) -> Result<Vec<PlayerProfile>, RepoError> {
        let rows = sqlx::query(
            "SELECT version, profile_json FROM players ORDER BY xp DESC, id ASC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_error("top_players"))?;

        rows.iter()
            .map(|row| versioned_from_row(row).map(|p| p.profile))
            .collect()
    }
}

#[async_trait]
impl SettlementRepo for SqliteStore {
    async fn commit_reward(
        &self,
        player: &VersionedPlayer,
        entry: &JournalEntry,
    ) -> Result<u64, RepoError> {
        let now = timestamp(entry.timestamp);
        let mut tx = self.pool.begin().await.map_err(sqlx_error("commit_reward"))?;

        Self::update_versioned(&mut tx, player, &now).await?;
        Self::insert_journal(&mut tx, entry).await?;

        tx.commit().await.map_err(sqlx_error("commit_reward"))?;
        Ok(player.version + 1)
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

        let now = timestamp(record.timestamp);
        let mut tx = self.pool.begin().await.map_err(sqlx_error("commit_battle"))?;

        // An early return drops `tx`, which rolls everything back
        Self::update_versioned(&mut tx, attacker, &now).await?;
        Self::update_versioned(&mut tx, defender, &now).await?;

        sqlx::query(
            r#"
            INSERT INTO battles (id, attacker_id, defender_id, winner_id, record_json, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.attacker_id().as_str())
        .bind(record.defender_id().as_str())
        .bind(record.winner_id.as_str())
        .bind(to_json(record)?)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(sqlx_error("insert_battle"))?;

        for entry in entries {
            Self::insert_journal(&mut tx, entry).await?;
        }

        tx.commit().await.map_err(sqlx_error("commit_battle"))?;
        Ok(())
    }
}

#[async_trait]
impl AuditRepo for SqliteStore {
    async fn journal_for_player(
        &self,
        id: &PlayerId,
        limit: u32,
    ) -> Result<Vec<JournalEntry>, RepoError> {
        let rows = sqlx::query(
            "SELECT entry_json FROM journal WHERE player_id = ? ORDER BY seq DESC LIMIT ?",
        )
        .bind(id.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_error("journal_for_player"))?;

        rows.iter()
            .map(|row| from_json_column(row, "entry_json"))
            .collect()
    }

    async fn battles_for_player(
        &self,
        id: &PlayerId,
        limit: u32,
    ) -> Result<Vec<BattleRecord>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT record_json FROM battles
            WHERE attacker_id = ? OR defender_id = ?
            ORDER BY seq DESC
            LIMIT ?
            "#,
        )
        .bind(id.as_str())
        .bind(id.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_error("battles_for_player"))?;

        rows.iter()
            .map(|row| from_json_column(row, "record_json"))
            .collect()
    }
}

// =============================================================================
// Row helpers
// =============================================================================

fn versioned_from_row(row: &SqliteRow) -> Result<VersionedPlayer, RepoError> {
    let version: i64 = row
        .try_get("version")
        .map_err(sqlx_error("read_player"))?;
    let profile: PlayerProfile = from_json_column(row, "profile_json")?;
    let version = u64::try_from(version)
        .map_err(|_| RepoError::serialization(format!("negative version {version}")))?;
    Ok(VersionedPlayer::new(profile, version))
}

fn from_json_column<T: serde::de::DeserializeOwned>(
    row: &SqliteRow,
    column: &str,
) -> Result<T, RepoError> {
    let json: String = row.try_get(column).map_err(sqlx_error("read_row"))?;
    serde_json::from_str(&json).map_err(RepoError::serialization)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, RepoError> {
    serde_json::to_string(value).map_err(RepoError::serialization)
}

fn to_i64(value: u64) -> Result<i64, RepoError> {
    i64::try_from(value).map_err(|_| RepoError::serialization(format!("{value} overflows i64")))
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Lost connections and lock waits are `Unavailable`; everything else is a
/// plain database error.
fn sqlx_error(operation: &'static str) -> impl Fn(sqlx::Error) -> RepoError {
    move |e| match &e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepoError::unavailable(operation, &e)
        }
        sqlx::Error::Database(db) if db.message().contains("database is locked") => {
            RepoError::unavailable(operation, &e)
        }
        _ => RepoError::database(operation, &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acornquest_domain::{
        resolve_battle, BattleId, BattleSide, DisplayName, JournalEntryId, PowerRolls,
    };
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 2, 12, 0, 0).unwrap()
    }

    fn profile(id: &str, xp: u64) -> PlayerProfile {
        PlayerProfile::new(
            PlayerId::new(id).unwrap(),
            DisplayName::new(id).unwrap(),
            now(),
        )
        .with_xp(xp)
    }

    async fn store_in(dir: &tempfile::TempDir) -> SqliteStore {
        let path = dir.path().join("acornquest.db");
        SqliteStore::new(path.to_str().unwrap()).await.unwrap()
    }

    fn settle(
        attacker: &VersionedPlayer,
        defender: &VersionedPlayer,
    ) -> (VersionedPlayer, VersionedPlayer, BattleRecord, Vec<JournalEntry>) {
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
            now(),
        );
        let entries = vec![
            JournalEntry::battle(
                JournalEntryId::new(),
                attacker.id().clone(),
                defender.profile.display_name().as_str(),
                outcome.attacker_won,
                &outcome.attacker,
                now(),
            ),
            JournalEntry::battle(
                JournalEntryId::new(),
                defender.id().clone(),
                attacker.profile.display_name().as_str(),
                !outcome.attacker_won,
                &outcome.defender,
                now(),
            ),
        ];
        let mut a = attacker.clone();
        a.profile
            .apply_battle(BattleSide::Attacker, &outcome.attacker, now());
        let mut d = defender.clone();
        d.profile
            .apply_battle(BattleSide::Defender, &outcome.defender, now());
        (a, d, record, entries)
    }

    #[tokio::test]
    async fn profiles_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = store_in(&dir).await;
            store.insert(&profile("alice", 120)).await.unwrap();
        }

        let store = store_in(&dir).await;
        let alice = store
            .get(&PlayerId::new("alice").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(alice.version, 1);
        assert_eq!(alice.profile, profile("alice", 120));
        assert!(store
            .get(&PlayerId::new("nobody").unwrap())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_insert_is_a_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        store.insert(&profile("alice", 0)).await.unwrap();
        assert!(store
            .insert(&profile("alice", 0))
            .await
            .unwrap_err()
            .is_conflict());
    }

    #[tokio::test]
    async fn battle_commit_writes_everything_together() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        let attacker = store.insert(&profile("alice", 150)).await.unwrap();
        let defender = store.insert(&profile("bob", 50)).await.unwrap();

        let (a, d, record, entries) = settle(&attacker, &defender);
        store.commit_battle(&a, &d, &record, &entries).await.unwrap();

        let stored_a = store.get(attacker.id()).await.unwrap().unwrap();
        let stored_d = store.get(defender.id()).await.unwrap().unwrap();
        assert_eq!(stored_a.version, 2);
        assert_eq!(stored_a.profile.xp(), 210);
        assert_eq!(stored_d.profile.acorns(), 45);
        assert!(stored_d.profile.shield_end_time().is_some());

        let battles = store.battles_for_player(defender.id(), 10).await.unwrap();
        assert_eq!(battles, vec![record]);
        assert_eq!(
            store.journal_for_player(attacker.id(), 10).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn stale_defender_rolls_back_attacker() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        let attacker = store.insert(&profile("alice", 150)).await.unwrap();
        let defender = store.insert(&profile("bob", 50)).await.unwrap();

        let (a, mut d, record, entries) = settle(&attacker, &defender);
        d.version = 7;

        let err = store
            .commit_battle(&a, &d, &record, &entries)
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let stored_a = store.get(attacker.id()).await.unwrap().unwrap();
        assert_eq!(stored_a, attacker);
        assert!(store
            .battles_for_player(attacker.id(), 10)
            .await
            .unwrap()
            .is_empty());
        assert!(store
            .journal_for_player(attacker.id(), 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn journal_is_newest_first_and_leaderboard_is_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        let alice = store.insert(&profile("alice", 300)).await.unwrap();
        let bob = store.insert(&profile("bob", 300)).await.unwrap();
        store.insert(&profile("carol", 900)).await.unwrap();

        // Two battles between the same pair
        let (a, d, record, entries) = settle(&alice, &bob);
        store.commit_battle(&a, &d, &record, &entries).await.unwrap();
        let (a2, d2, record2, entries2) = settle(&committed(&a), &committed(&d));
        store
            .commit_battle(&a2, &d2, &record2, &entries2)
            .await
            .unwrap();

        let journal = store.journal_for_player(alice.id(), 10).await.unwrap();
        assert_eq!(journal.len(), 2);
        assert_eq!(journal[0].id, entries2[0].id);

        let history = store.battles_for_player(bob.id(), 1).await.unwrap();
        assert_eq!(history, vec![record2]);

        let top: Vec<String> = store
            .top_by_xp(2)
            .await
            .unwrap()
            .iter()
            .map(|p| p.id().to_string())
            .collect();
        assert_eq!(top[0], "carol");
        assert_eq!(top.len(), 2);
    }

    fn committed(player: &VersionedPlayer) -> VersionedPlayer {
        VersionedPlayer::new(player.profile.clone(), player.version + 1)
    }
}
