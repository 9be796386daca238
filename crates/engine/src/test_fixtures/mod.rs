//! Shared helpers for engine tests.

use std::sync::Arc;

use acornquest_domain::{DisplayName, PlayerId, PlayerProfile};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::infrastructure::memory::InMemoryStore;
use crate::infrastructure::ports::PlayerRepo;

/// Monday 2024-09-02 12:00 UTC.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 2, 12, 0, 0).unwrap()
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A fresh profile named after its id, with `xp` already earned.
pub fn player(id: &str, xp: u64) -> PlayerProfile {
    PlayerProfile::new(
        PlayerId::new(id).unwrap(),
        DisplayName::new(id).unwrap(),
        fixed_now() - chrono::Duration::days(30),
    )
    .with_xp(xp)
}

/// In-memory store holding `players`, each at version 1.
pub async fn seeded_store(players: &[PlayerProfile]) -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    for profile in players {
        store.insert(profile).await.unwrap();
    }
    store
}
