//! Error types shared by every storage backend.
//!
//! [`StorageError`] is the primary error type returned by all repository and
//! store operations. It provides specific variants for common failure modes
//! while keeping the surface area small enough for exhaustive pattern
//! matching. Backend crates map their engine errors into these variants.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No repository is registered for the requested entity type.
    #[error("no repository registered for type: {0}")]
    NotRegistered(&'static str),

    /// Database engine error.
    #[error("database error: {0}")]
    Database(String),

    /// Connection acquisition or bootstrap failure.
    #[error("connection failure: {0}")]
    Connection(String),

    /// Engine-level insert/update rejection.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// JSON serialization/deserialization error.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Filesystem error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested entity was not found.
    #[error("entity not found: {0}")]
    NotFound(String),

    /// Internal error (e.g. a panicked worker task).
    #[error("internal error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Build a [`StorageError::Database`] from any displayable engine error.
    pub fn database(err: impl std::fmt::Display) -> Self {
        Self::Database(err.to_string())
    }

    /// Build a [`StorageError::Connection`] from any displayable cause.
    pub fn connection(err: impl std::fmt::Display) -> Self {
        Self::Connection(err.to_string())
    }
}

/// Convenience type alias for storage results.
pub type Result<T> = std::result::Result<T, StorageError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
