//! Identity manager error types.

use idm_config::ConfigError;
use idm_core::ErrorKind;
use idm_model::ModelError;
use idm_spi::SpiError;
use idm_storage::StorageError;
use thiserror::Error;

/// Errors returned by identity managers.
#[derive(Debug, Error)]
pub enum IdentityManagerError {
    // === Dispatch ===
    /// No store can serve the request.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The parent of a new group does not exist in the serving store.
    #[error("parent group '{parent}' not found")]
    ParentNotFound {
        /// Key of the missing parent.
        parent: String,
    },

    /// An entity with the same key already exists.
    #[error("{entity} with key '{key}' already exists")]
    DuplicateKey {
        /// Entity type.
        entity: &'static str,
        /// Conflicting key.
        key: String,
    },

    /// The entity to update or remove does not exist.
    #[error("{entity} with key '{key}' not found")]
    NotFound {
        /// Entity type.
        entity: &'static str,
        /// Missing key.
        key: String,
    },

    /// The group still has children and the store does not cascade.
    #[error("group '{key}' still has {children} child group(s)")]
    HasChildren {
        /// Group key.
        key: String,
        /// Number of direct children.
        children: usize,
    },

    /// A key could not be parsed.
    #[error("invalid identity key '{0}'")]
    InvalidKey(String),

    /// An identity failed validation.
    #[error("invalid identity: {0}")]
    InvalidIdentity(#[from] ModelError),

    // === Policy ===
    /// The security policy rejected the call.
    #[error("access denied to '{operation}': {reason}")]
    AccessDenied {
        /// Rejected operation.
        operation: String,
        /// Reason given by the policy.
        reason: String,
    },

    // === Backend ===
    /// The backend store failed.
    #[error(transparent)]
    Backend(StorageError),

    /// A context initializer failed or the context is closed.
    #[error(transparent)]
    Initializer(#[from] SpiError),

    // === Configuration ===
    /// The factory could not be built.
    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

impl IdentityManagerError {
    /// Creates an unsupported error.
    #[must_use]
    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::Unsupported(what.into())
    }

    /// Checks if this is a not found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Checks if this is a duplicate key error.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }

    /// Checks if the policy denied the call.
    #[must_use]
    pub const fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }

    /// Returns the taxonomy category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unsupported(_)
            | Self::ParentNotFound { .. }
            | Self::DuplicateKey { .. }
            | Self::NotFound { .. }
            | Self::HasChildren { .. }
            | Self::InvalidKey(_)
            | Self::InvalidIdentity(_) => ErrorKind::Dispatch,
            Self::AccessDenied { .. } => ErrorKind::Policy,
            Self::Backend(_) => ErrorKind::Backend,
            Self::Initializer(err) => err.kind(),
            Self::Configuration(_) => ErrorKind::Configuration,
        }
    }
}

impl From<StorageError> for IdentityManagerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Duplicate { entity_type, key } => Self::DuplicateKey {
                entity: entity_type,
                key,
            },
            StorageError::NotFound { entity_type, key } => Self::NotFound {
                entity: entity_type,
                key,
            },
            other => Self::Backend(other),
        }
    }
}

/// Result type for identity manager operations.
pub type ManagerResult<T> = Result<T, IdentityManagerError>;
