use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            pub fn to_uuid(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

// Audit record IDs
define_id!(BattleId);
define_id!(JournalEntryId);

/// Maximum length for player identifiers
const MAX_PLAYER_ID_LENGTH: usize = 128;

/// Stable player identifier issued by the identity provider.
///
/// Player ids are opaque strings (the identity store keys documents by them),
/// so unlike the record ids above they are not UUIDs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlayerId(String);

impl PlayerId {
    /// Create a validated player id.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidId` if the id is empty after trimming,
    /// longer than 128 characters, or contains whitespace or `/`.
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        let trimmed = id.trim();

        if trimmed.is_empty() {
            return Err(DomainError::invalid_id("Player ID cannot be empty"));
        }
        if trimmed.len() > MAX_PLAYER_ID_LENGTH {
            return Err(DomainError::invalid_id(format!(
                "Player ID cannot exceed {} characters",
                MAX_PLAYER_ID_LENGTH
            )));
        }
        if trimmed.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(DomainError::invalid_id(
                "Player ID cannot contain whitespace or '/'",
            ));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for PlayerId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<PlayerId> for String {
    fn from(id: PlayerId) -> String {
        id.0
    }
}
