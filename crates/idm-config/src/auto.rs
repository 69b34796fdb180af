//! Auto-configuration of a single store when none was declared.

use std::sync::Arc;

use idm_core::Config;

use crate::error::ConfigResult;
use crate::store::{FileSettings, JpaSettings, StoreConfiguration};

/// Answers whether a relational backend is ready to hold identities.
pub trait ReadinessProbe: Send + Sync + std::fmt::Debug {
    /// Returns the relational settings as currently discoverable.
    ///
    /// ## Errors
    ///
    /// Returns [`crate::ConfigError::Probe`] when the probe itself fails.
    fn probe_jpa(&self) -> ConfigResult<JpaSettings>;
}

/// Probe answering from the ambient runtime [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigProbe {
    settings: JpaSettings,
}

impl ConfigProbe {
    /// Creates a probe reading the relational section of `config`.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            settings: JpaSettings::from(&config.jpa),
        }
    }
}

impl ReadinessProbe for ConfigProbe {
    fn probe_jpa(&self) -> ConfigResult<JpaSettings> {
        Ok(self.settings.clone())
    }
}

/// Probe that never finds a relational backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredProbe;

impl ReadinessProbe for UnconfiguredProbe {
    fn probe_jpa(&self) -> ConfigResult<JpaSettings> {
        Ok(JpaSettings::default())
    }
}

/// Picks a backend for a configuration that declared no stores.
///
/// A relational store wins when the probe reports it configured; the file
/// store is the fallback. The resulting store supports every core identity
/// kind, every standard relationship kind, custom relationships and
/// multiple realms.
#[derive(Debug, Clone)]
pub struct AutoConfigurationResolver {
    probe: Arc<dyn ReadinessProbe>,
    file_settings: FileSettings,
}

impl AutoConfigurationResolver {
    /// Creates a resolver.
    #[must_use]
    pub fn new(probe: Arc<dyn ReadinessProbe>, file_settings: FileSettings) -> Self {
        Self {
            probe,
            file_settings,
        }
    }

    /// Creates a resolver driven entirely by the runtime config.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(ConfigProbe::new(config)),
            FileSettings::from(&config.file_store),
        )
    }

    /// Resolves the store configuration.
    ///
    /// ## Errors
    ///
    /// Propagates probe failures as configuration errors.
    pub fn resolve(&self) -> ConfigResult<StoreConfiguration> {
        let jpa = self.probe.probe_jpa()?;

        let mut store = if jpa.is_configured() {
            tracing::info!(
                persistence_unit = ?jpa.persistence_unit,
                "Auto-configuring relational identity store"
            );
            StoreConfiguration::jpa(jpa)
        } else {
            tracing::info!(
                working_dir = ?self.file_settings.working_dir,
                "No relational backend configured, falling back to file identity store"
            );
            StoreConfiguration::file(self.file_settings.clone())
        };

        store
            .features_mut()
            .add_feature_support()
            .add_relationship_support()
            .set_supports_custom_relationships(true)
            .set_supports_multi_realm(true);

        Ok(store)
    }
}

impl Default for AutoConfigurationResolver {
    fn default() -> Self {
        Self::new(Arc::new(UnconfiguredProbe), FileSettings::in_memory())
    }
}
