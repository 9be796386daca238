//! AcornQuest engine library.
//!
//! Settlement of battles and rewards over the `acornquest-domain` rules.
//!
//! ## Structure
//!
//! - `use_cases/` - Settlement orchestration (battles, rewards, players)
//! - `infrastructure/` - Port traits and their adapters (SQLite, memory, Canvas)
//! - `api/` - HTTP entry points
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod use_cases;

/// Shared helpers for unit tests.
#[cfg(test)]
pub mod test_fixtures;

pub use app::App;
