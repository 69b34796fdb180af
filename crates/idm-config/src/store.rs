//! Store configurations: one entry per backend the runtime may dispatch to.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use idm_core::config::{FileStoreConfig, JpaConfig};
use idm_spi::{ContextFactory, ContextInitializer};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::feature::FeatureSet;

/// Entity descriptor that must be mapped for a relational unit to hold identities.
pub const IDENTITY_TYPE_ENTITY: &str = "IdentityType";

/// Backend variant of a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreKind {
    /// Relational store bound to a persistence unit.
    Jpa,
    /// Directory store.
    Ldap,
    /// File-backed store.
    File,
    /// Application-provided backend.
    Custom(String),
}

impl StoreKind {
    /// Returns the kind name used as registry key and in logs.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Jpa => "jpa",
            Self::Ldap => "ldap",
            Self::File => "file",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings of a relational store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JpaSettings {
    /// Persistence unit name.
    pub persistence_unit: Option<String>,
    /// Mapped entity descriptors.
    pub mapped_entities: Vec<String>,
}

impl JpaSettings {
    /// Creates settings for a persistence unit.
    #[must_use]
    pub fn new(persistence_unit: impl Into<String>) -> Self {
        Self {
            persistence_unit: Some(persistence_unit.into()),
            mapped_entities: Vec::new(),
        }
    }

    /// Adds a mapped entity descriptor.
    #[must_use]
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.mapped_entities.push(entity.into());
        self
    }

    /// True when the identity-type entity is mapped.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.mapped_entities.iter().any(|e| e == IDENTITY_TYPE_ENTITY)
    }
}

impl From<&JpaConfig> for JpaSettings {
    fn from(config: &JpaConfig) -> Self {
        Self {
            persistence_unit: config.persistence_unit.clone(),
            mapped_entities: config.mapped_entities.clone(),
        }
    }
}

/// Settings of a directory store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LdapSettings {
    /// Server URL, `ldap://` or `ldaps://`.
    pub url: String,
    /// Base DN.
    pub base_dn: String,
    /// Bind DN.
    pub bind_dn: Option<String>,
    /// Bind credential.
    #[serde(skip_serializing)]
    pub bind_credential: Option<String>,
    /// DN suffix for users.
    pub user_dn_suffix: Option<String>,
    /// DN suffix for groups.
    pub group_dn_suffix: Option<String>,
    /// DN suffix for roles.
    pub role_dn_suffix: Option<String>,
    /// DN suffix for agents.
    pub agent_dn_suffix: Option<String>,
}

impl LdapSettings {
    /// Creates settings for a server and base DN.
    #[must_use]
    pub fn new(url: impl Into<String>, base_dn: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            base_dn: base_dn.into(),
            ..Self::default()
        }
    }

    /// Sets bind credentials.
    #[must_use]
    pub fn with_bind(mut self, bind_dn: impl Into<String>, credential: impl Into<String>) -> Self {
        self.bind_dn = Some(bind_dn.into());
        self.bind_credential = Some(credential.into());
        self
    }

    fn validate(&self, store: &str) -> ConfigResult<()> {
        if !(self.url.starts_with("ldap://") || self.url.starts_with("ldaps://")) {
            return Err(ConfigError::invalid_store(
                store,
                format!("url '{}' must start with ldap:// or ldaps://", self.url),
            ));
        }
        if self.base_dn.trim().is_empty() {
            return Err(ConfigError::invalid_store(store, "base DN must not be empty"));
        }
        if self.bind_dn.is_some() != self.bind_credential.is_some() {
            return Err(ConfigError::invalid_store(
                store,
                "bind DN and bind credential must be set together",
            ));
        }
        Ok(())
    }
}

/// Settings of a file-backed store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    /// Directory holding data files; `None` keeps data in memory only.
    pub working_dir: Option<PathBuf>,
    /// Truncate existing files when the store opens.
    pub always_create_files: bool,
    /// Skip syncing data files to disk after each write.
    pub async_write: bool,
}

impl FileSettings {
    /// In-memory settings.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Settings persisting into `dir`.
    #[must_use]
    pub fn persistent(dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(dir.into()),
            ..Self::default()
        }
    }
}

impl From<&FileStoreConfig> for FileSettings {
    fn from(config: &FileStoreConfig) -> Self {
        Self {
            working_dir: config.working_dir.clone(),
            always_create_files: config.always_create_files,
            async_write: config.async_write,
        }
    }
}

/// Backend-specific settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreSettings {
    /// Relational settings.
    Jpa(JpaSettings),
    /// Directory settings.
    Ldap(LdapSettings),
    /// File settings.
    File(FileSettings),
    /// Free-form properties for custom backends.
    Custom(BTreeMap<String, String>),
}

/// Configuration of one store.
#[derive(Debug, Clone)]
pub struct StoreConfiguration {
    name: String,
    kind: StoreKind,
    settings: StoreSettings,
    features: FeatureSet,
    context_initializers: Vec<Arc<dyn ContextInitializer>>,
    context_factory: Option<Arc<dyn ContextFactory>>,
}

impl StoreConfiguration {
    fn with_settings(kind: StoreKind, settings: StoreSettings) -> Self {
        Self {
            name: kind.to_string(),
            kind,
            settings,
            features: FeatureSet::new(),
            context_initializers: Vec::new(),
            context_factory: None,
        }
    }

    /// Relational store.
    #[must_use]
    pub fn jpa(settings: JpaSettings) -> Self {
        Self::with_settings(StoreKind::Jpa, StoreSettings::Jpa(settings))
    }

    /// Directory store.
    #[must_use]
    pub fn ldap(settings: LdapSettings) -> Self {
        Self::with_settings(StoreKind::Ldap, StoreSettings::Ldap(settings))
    }

    /// File-backed store.
    #[must_use]
    pub fn file(settings: FileSettings) -> Self {
        Self::with_settings(StoreKind::File, StoreSettings::File(settings))
    }

    /// Application-provided backend registered under `kind`.
    #[must_use]
    pub fn custom(kind: impl Into<String>, properties: BTreeMap<String, String>) -> Self {
        Self::with_settings(StoreKind::Custom(kind.into()), StoreSettings::Custom(properties))
    }

    /// Overrides the store name (defaults to the kind name).
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the feature set.
    #[must_use]
    pub fn with_features(mut self, features: FeatureSet) -> Self {
        self.features = features;
        self
    }

    /// Store name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backend kind.
    #[must_use]
    pub const fn kind(&self) -> &StoreKind {
        &self.kind
    }

    /// Backend settings.
    #[must_use]
    pub const fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Declared capabilities.
    #[must_use]
    pub const fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// Mutable access to the declared capabilities.
    pub fn features_mut(&mut self) -> &mut FeatureSet {
        &mut self.features
    }

    /// Appends a context initializer.
    pub fn add_context_initializer(&mut self, initializer: Arc<dyn ContextInitializer>) {
        self.context_initializers.push(initializer);
    }

    /// Context initializers in registration order.
    #[must_use]
    pub fn context_initializers(&self) -> &[Arc<dyn ContextInitializer>] {
        &self.context_initializers
    }

    /// Attaches the shared context factory.
    pub fn set_context_factory(&mut self, factory: Arc<dyn ContextFactory>) {
        self.context_factory = Some(factory);
    }

    /// Shared context factory, present once the configuration is built.
    #[must_use]
    pub fn context_factory(&self) -> Option<&Arc<dyn ContextFactory>> {
        self.context_factory.as_ref()
    }

    /// Whether the backend needs an initializer bound before use.
    #[must_use]
    pub const fn requires_context_initializer(&self) -> bool {
        matches!(self.kind, StoreKind::Jpa)
    }

    /// Validates the backend settings.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigError::InvalidStore`] when the settings do not match
    /// the kind or are incomplete.
    pub fn validate(&self) -> ConfigResult<()> {
        match (&self.kind, &self.settings) {
            (StoreKind::Jpa, StoreSettings::Jpa(jpa)) => {
                if jpa.persistence_unit.as_deref().is_none_or(str::is_empty) {
                    return Err(ConfigError::invalid_store(&self.name, "persistence unit not set"));
                }
                if !jpa.is_configured() {
                    return Err(ConfigError::invalid_store(
                        &self.name,
                        format!("entity '{IDENTITY_TYPE_ENTITY}' is not mapped"),
                    ));
                }
                Ok(())
            }
            (StoreKind::Ldap, StoreSettings::Ldap(ldap)) => ldap.validate(&self.name),
            (StoreKind::File, StoreSettings::File(_)) => Ok(()),
            (StoreKind::Custom(kind), StoreSettings::Custom(_)) if !kind.is_empty() => Ok(()),
            (kind, _) => Err(ConfigError::invalid_store(
                &self.name,
                format!("settings do not match store kind '{kind}'"),
            )),
        }
    }
}
