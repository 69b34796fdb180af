//! Storage error types.

use idm_core::ErrorKind;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Entity not found.
    #[error("Entity not found: {entity_type} with key '{key}'")]
    NotFound {
        /// Type of entity (e.g., "group", "relationship").
        entity_type: &'static str,
        /// Entity key.
        key: String,
    },

    /// Duplicate entity (unique key violation).
    #[error("Duplicate {entity_type}: key '{key}' already exists")]
    Duplicate {
        /// Type of entity.
        entity_type: &'static str,
        /// Conflicting key.
        key: String,
    },

    /// Invalid data.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Backend connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// I/O error while reading or writing backend files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error.
    #[error("Internal storage error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Creates a not found error for an entity.
    #[must_use]
    pub fn not_found(entity_type: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            key: key.into(),
        }
    }

    /// Creates a duplicate error.
    #[must_use]
    pub fn duplicate(entity_type: &'static str, key: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type,
            key: key.into(),
        }
    }

    /// Checks if this is a not found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Checks if this is a duplicate error.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    /// Returns the taxonomy category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Backend
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
