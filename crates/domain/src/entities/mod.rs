//! Write-once audit entities.

mod battle_record;
mod journal;

pub use battle_record::{BattleParticipant, BattleRecord};
pub use journal::{JournalEntry, JournalKind};
