//! Model validation errors.

use thiserror::Error;

/// Errors raised when an entity or key is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A key does not follow the `<KIND>://<identifier>` scheme.
    #[error("invalid key '{0}'")]
    InvalidKey(String),

    /// An identifying field is empty or contains a reserved character.
    #[error("invalid {field} '{value}': {reason}")]
    InvalidField {
        /// Name of the field.
        field: &'static str,
        /// Rejected value.
        value: String,
        /// Why the value was rejected.
        reason: &'static str,
    },
}

impl ModelError {
    /// Creates an invalid field error.
    #[must_use]
    pub fn invalid_field(field: &'static str, value: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidField {
            field,
            value: value.into(),
            reason,
        }
    }
}

/// Result type for model validation.
pub type ModelResult<T> = Result<T, ModelError>;

/// Checks that an identifying field is not blank.
pub(crate) fn check_not_empty(field: &'static str, value: &str) -> ModelResult<()> {
    if value.trim().is_empty() {
        return Err(ModelError::invalid_field(field, value, "must not be empty"));
    }
    Ok(())
}

/// Checks that an identifying field can be used as a path segment.
pub(crate) fn check_path_segment(field: &'static str, value: &str) -> ModelResult<()> {
    check_not_empty(field, value)?;
    if value.contains('/') {
        return Err(ModelError::invalid_field(field, value, "must not contain '/'"));
    }
    Ok(())
}
