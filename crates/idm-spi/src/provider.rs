//! Extension hooks: context factories and context initializers.

use std::fmt::Debug;

use async_trait::async_trait;
use idm_core::ErrorKind;
use idm_core::config::DEFAULT_REALM;
use thiserror::Error;

use crate::context::{IdentityContext, Scope};

/// Error type for SPI operations.
#[derive(Debug, Error)]
pub enum SpiError {
    /// A context initializer failed to prepare a store.
    #[error("context initialization failed for store '{store}': {reason}")]
    InitializationFailed {
        /// Name of the store being prepared.
        store: String,
        /// Failure description.
        reason: String,
    },

    /// The context was closed before the call.
    #[error("identity context {0} is closed")]
    ContextClosed(uuid::Uuid),
}

impl SpiError {
    /// Creates an initialization failure.
    #[must_use]
    pub fn initialization(store: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InitializationFailed {
            store: store.into(),
            reason: reason.into(),
        }
    }

    /// Returns the taxonomy category of this error.
    ///
    /// Initializers sit in front of a backend, so their failures are
    /// reported like backend failures.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InitializationFailed { .. } => ErrorKind::Backend,
            Self::ContextClosed(_) => ErrorKind::Dispatch,
        }
    }
}

/// Hook invoked before a store serves its first request in a scope.
///
/// Used by backends that need an ambient resource bound first, such as a
/// transactional unit. The runtime runs each initializer at most once per
/// scope per store.
#[async_trait]
pub trait ContextInitializer: Send + Sync + Debug {
    /// Returns a name for logs.
    fn name(&self) -> &str;

    /// Prepares `store` for use within `context`.
    ///
    /// ## Errors
    ///
    /// Returns an error if the resource could not be bound.
    async fn initialize(&self, context: &IdentityContext, store: &str) -> Result<(), SpiError>;
}

/// Produces the execution context handed to every identity manager.
pub trait ContextFactory: Send + Sync + Debug {
    /// Creates a context for the caller's scope.
    fn create_context(&self, scope: &Scope) -> IdentityContext;
}

/// Context factory resolving scopes against a default realm.
#[derive(Debug, Clone)]
pub struct DefaultContextFactory {
    default_realm: String,
}

impl DefaultContextFactory {
    /// Creates a factory whose default realm is `default_realm`.
    #[must_use]
    pub fn new(default_realm: impl Into<String>) -> Self {
        Self {
            default_realm: default_realm.into(),
        }
    }

    /// Returns the default realm.
    #[must_use]
    pub fn default_realm(&self) -> &str {
        &self.default_realm
    }
}

impl Default for DefaultContextFactory {
    fn default() -> Self {
        Self::new(DEFAULT_REALM)
    }
}

impl ContextFactory for DefaultContextFactory {
    fn create_context(&self, scope: &Scope) -> IdentityContext {
        let realm = scope
            .realm
            .clone()
            .unwrap_or_else(|| self.default_realm.clone());
        let is_default = realm == self.default_realm;

        tracing::debug!(realm = %realm, tenant = ?scope.tenant, "Creating identity context");

        IdentityContext::new(realm, is_default, scope.tenant.clone())
    }
}
