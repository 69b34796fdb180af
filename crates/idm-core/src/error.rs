//! Error taxonomy for the identity runtime.
//!
//! Every error raised anywhere in the workspace falls into one of the
//! [`ErrorKind`] categories. Configuration errors are fatal at startup;
//! the others are reported per call and never corrupt the runtime topology.

use thiserror::Error;

/// Result type alias using the core error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Category of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Raised while resolving or building a configuration. Aborts startup.
    Configuration,
    /// Raised by the facade for a single call (unsupported type, missing
    /// parent, duplicate key, ...).
    Dispatch,
    /// Raised by a backend store and propagated unchanged.
    Backend,
    /// Raised by the securing decorator when the policy rejects a call.
    Policy,
}

impl ErrorKind {
    /// Returns whether errors of this kind abort factory construction.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Configuration)
    }

    /// Returns whether the immediate caller can recover from the error.
    #[must_use]
    pub const fn is_recoverable(self) -> bool {
        !self.is_fatal()
    }
}

/// Errors raised while loading runtime settings.
#[derive(Debug, Error)]
pub enum Error {
    /// Generic configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A setting had a value that could not be parsed.
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue {
        /// Name of the setting.
        key: &'static str,
        /// Raw value that was rejected.
        value: String,
    },
}

impl Error {
    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid_value(key: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            key,
            value: value.into(),
        }
    }

    /// Returns the taxonomy category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}
