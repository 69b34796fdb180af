//! Configuration-resolved notification.

use crate::error::ConfigResult;
use crate::identity::IdentityConfiguration;

/// Observer notified once the configuration is assembled, before it is built.
///
/// Listeners run synchronously in registration order and may still mutate
/// the configuration. An error aborts initialization.
pub trait ConfigurationListener: Send + Sync {
    /// Returns a name for logs and errors.
    fn name(&self) -> &str;

    /// Called with the resolved configuration.
    ///
    /// ## Errors
    ///
    /// Returns [`crate::ConfigError::Rejected`] (or any other configuration
    /// error) to abort initialization.
    fn on_configuration_resolved(&self, configuration: &mut IdentityConfiguration) -> ConfigResult<()>;
}
