//! Error types for port operations.

/// Repository operation errors with context for debugging.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RepoError {
    /// Entity not found - includes entity type and ID for actionable error messages.
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// A compare-and-commit lost the race: the stored version moved on since
    /// the caller read it. Nothing was written.
    #[error("Concurrent modification of {entity_type} {id}")]
    Conflict {
        entity_type: &'static str,
        id: String,
    },

    /// The store could not be reached in time. The write may or may not have
    /// landed; callers must not assume either.
    #[error("Storage unavailable during {operation}: {message}")]
    Unavailable {
        operation: &'static str,
        message: String,
    },

    /// Database operation failed - includes operation name for tracing.
    #[error("Database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Business constraint violated.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl RepoError {
    /// Create a NotFound error with entity type and ID context.
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Create a Conflict error for a stale version.
    pub fn conflict(entity_type: &'static str, id: impl ToString) -> Self {
        Self::Conflict {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Create an Unavailable error with operation context.
    pub fn unavailable(operation: &'static str, message: impl ToString) -> Self {
        Self::Unavailable {
            operation,
            message: message.to_string(),
        }
    }

    /// Create a Database error with operation context.
    pub fn database(operation: &'static str, message: impl ToString) -> Self {
        Self::Database {
            operation,
            message: message.to_string(),
        }
    }

    /// Create a Serialization error.
    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization(message.to_string())
    }

    /// Create a ConstraintViolation error.
    pub fn constraint(message: impl ToString) -> Self {
        Self::ConstraintViolation(message.to_string())
    }

    /// Check if this is a NotFound error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a version Conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Whether repeating the whole read-modify-commit cycle can succeed.
    ///
    /// Only conflicts qualify. An `Unavailable` write has unknown effect, so
    /// repeating it could apply the mutation twice.
    pub fn is_retryable(&self) -> bool {
        self.is_conflict()
    }
}

/// Failures talking to the external course data provider.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CourseDataError {
    #[error("Course data provider unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid course data response: {0}")]
    InvalidResponse(String),
}
