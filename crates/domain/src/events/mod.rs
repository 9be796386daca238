//! Domain Events
//!
//! Return types from `PlayerProfile` mutations, communicating what happened
//! when progression state was modified.

pub mod player_events;

pub use player_events::*;
