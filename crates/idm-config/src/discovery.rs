//! Result of discovering identity configurations in the host application.

use crate::error::{ConfigError, ConfigResult};
use crate::identity::IdentityConfiguration;

/// What the host supplied: nothing, exactly one configuration, or too many.
#[derive(Debug, Default)]
pub enum ConfigurationSupply {
    /// No configuration was supplied.
    #[default]
    None,
    /// Exactly one configuration.
    One(IdentityConfiguration),
    /// More than one configuration; carries the count.
    Ambiguous(usize),
}

impl ConfigurationSupply {
    /// Classifies the discovered candidates.
    #[must_use]
    pub fn from_candidates(mut candidates: Vec<IdentityConfiguration>) -> Self {
        match candidates.len() {
            0 => Self::None,
            1 => candidates.pop().map_or(Self::None, Self::One),
            count => Self::Ambiguous(count),
        }
    }

    /// Turns the supply into the configuration to build.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigError::Ambiguous`] when more than one was supplied.
    pub fn resolve(self) -> ConfigResult<IdentityConfiguration> {
        match self {
            Self::None => {
                tracing::debug!("No identity configuration supplied, starting from an empty one");
                Ok(IdentityConfiguration::new())
            }
            Self::One(configuration) => Ok(configuration),
            Self::Ambiguous(count) => Err(ConfigError::Ambiguous { count }),
        }
    }
}
