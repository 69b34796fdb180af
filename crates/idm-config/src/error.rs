//! Configuration error types.
//!
//! Every variant is fatal: it aborts factory construction and surfaces to
//! the process initializer. No partially built factory is ever produced.

use idm_core::ErrorKind;
use thiserror::Error;

/// Errors raised while resolving, building or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// More than one configuration was supplied.
    #[error("{count} identity configurations found, can not configure the identity manager factory")]
    Ambiguous {
        /// Number of configurations supplied.
        count: usize,
    },

    /// Two feature sets make opposite explicit claims.
    #[error("conflicting claims for feature '{capability}' between {first} and {second}")]
    FeatureConflict {
        /// Capability both sides claim.
        capability: String,
        /// Side enabling or disabling the capability first.
        first: String,
        /// Side making the opposite claim.
        second: String,
    },

    /// `build()` was called on a configuration that is already frozen.
    #[error("identity configuration has already been built")]
    AlreadyBuilt,

    /// A mutation was attempted after `build()`.
    #[error("identity configuration is frozen: can not {operation}")]
    Frozen {
        /// Rejected operation.
        operation: &'static str,
    },

    /// A store needs a context initializer and none was registered.
    #[error("store '{store}' requires a context initializer but none was registered")]
    MissingContextInitializer {
        /// Store name.
        store: String,
    },

    /// Store settings are invalid.
    #[error("invalid configuration for store '{store}': {reason}")]
    InvalidStore {
        /// Store name.
        store: String,
        /// Why the settings were rejected.
        reason: String,
    },

    /// The backend readiness probe failed.
    #[error("backend readiness probe failed: {0}")]
    Probe(String),

    /// No backend implementation is registered for a store kind.
    #[error("no backend registered for store kind '{kind}'")]
    MissingBackend {
        /// Store kind.
        kind: String,
    },

    /// A configuration listener rejected the configuration.
    #[error("configuration rejected by listener '{listener}': {reason}")]
    Rejected {
        /// Listener name.
        listener: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an invalid store error.
    #[must_use]
    pub fn invalid_store(store: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidStore {
            store: store.into(),
            reason: reason.into(),
        }
    }

    /// Creates a probe error.
    #[must_use]
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe(msg.into())
    }

    /// Checks if this is a feature conflict.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::FeatureConflict { .. })
    }

    /// Returns the taxonomy category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
