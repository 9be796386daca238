//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Player storage and settlement (in-memory or SQLite)
//! - Course data (Canvas or a static list)
//! - Clock/Random (for testing)

mod error;
mod external;
mod repos;
mod testing;

// =============================================================================
// Repository Ports
// =============================================================================
pub use error::{CourseDataError, RepoError};
pub use repos::{AuditRepo, PlayerRepo, SettlementRepo, VersionedPlayer};

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::CourseDataPort;

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use repos::{MockAuditRepo, MockPlayerRepo, MockSettlementRepo};

#[cfg(test)]
pub use external::MockCourseDataPort;

#[cfg(test)]
pub use testing::{MockClockPort, MockRandomPort};

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::{ClockPort, RandomPort};
