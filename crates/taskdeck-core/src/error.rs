//! Error types for the taskdeck sync core.

use crate::entity::EntityKind;
use crate::notify::Operation;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the synchronization core.
///
/// Store-level variants (`DuplicateId`, `NotFound`) are invariant violations
/// that fail a single mutation. `InvalidTarget` is a caller error rejected
/// before any remote call. `Transport` and `Rejected` are remote failures
/// that trigger a rollback.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncError {
    /// Insert collided with an id already present in the store
    #[error("Duplicate id: {kind} '{id}' is already present")]
    DuplicateId { kind: EntityKind, id: String },

    /// Mutation targeted an id that is not in the store
    #[error("Entity not found: {kind} '{id}'")]
    NotFound { kind: EntityKind, id: String },

    /// Update or delete against an entity that has not been persisted yet
    #[error("Invalid target: {kind} '{id}' has not been persisted yet")]
    InvalidTarget { kind: EntityKind, id: String },

    /// Network or server failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered but did not acknowledge the mutation
    #[error("Server rejected {operation} on '{id}'")]
    Rejected { operation: Operation, id: String },

    /// Serialization/deserialization or shape normalization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// IO error (config file access)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a DuplicateId error
    pub fn duplicate_id(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::DuplicateId {
            kind,
            id: id.into(),
        }
    }

    /// Creates a NotFound error
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Creates an InvalidTarget error
    pub fn invalid_target(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::InvalidTarget {
            kind,
            id: id.into(),
        }
    }

    /// Creates a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates a Rejected error
    pub fn rejected(operation: Operation, id: impl Into<String>) -> Self {
        Self::Rejected {
            operation,
            id: id.into(),
        }
    }

    /// Creates a Serialization error for the given format or shape
    pub fn serialization(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Serialization {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is an InvalidTarget error
    pub fn is_invalid_target(&self) -> bool {
        matches!(self, Self::InvalidTarget { .. })
    }

    /// Check if this is a DuplicateId error
    pub fn is_duplicate_id(&self) -> bool {
        matches!(self, Self::DuplicateId { .. })
    }

    /// Check if this error came from the remote side (network or server).
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Rejected { .. })
    }

    /// Check if retrying the same mutation later may succeed.
    ///
    /// Remote failures are retryable; store-level and caller errors are not.
    pub fn is_retryable(&self) -> bool {
        self.is_remote()
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, SyncError>`.
pub type Result<T> = std::result::Result<T, SyncError>;
