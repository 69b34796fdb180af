//! Backend registry: maps store kinds to the factories that open them.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use idm_config::{ConfigError, StoreConfiguration, StoreKind, StoreSettings};
use idm_storage::{IdentityStore, StorageError, StorageResult};
use idm_store_file::FileIdentityStore;

use crate::error::ManagerResult;

/// Opens a backend store from its configuration.
#[async_trait]
pub trait BackendFactory: Send + Sync + Debug {
    /// Returns a short id for logs.
    fn id(&self) -> &'static str;

    /// Creates the store described by `config`.
    ///
    /// ## Errors
    ///
    /// Returns an error if the backend can not be opened.
    async fn create(&self, config: &StoreConfiguration) -> StorageResult<Arc<dyn IdentityStore>>;
}

/// Factory for [`FileIdentityStore`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FileBackendFactory;

#[async_trait]
impl BackendFactory for FileBackendFactory {
    fn id(&self) -> &'static str {
        "file"
    }

    async fn create(&self, config: &StoreConfiguration) -> StorageResult<Arc<dyn IdentityStore>> {
        let StoreSettings::File(settings) = config.settings() else {
            return Err(StorageError::InvalidData(format!(
                "store '{}' has no file settings",
                config.name()
            )));
        };
        let store = FileIdentityStore::open(settings).await?.with_name(config.name());
        Ok(Arc::new(store))
    }
}

/// Registry of backend factories keyed by store kind.
#[derive(Debug, Default)]
pub struct BackendRegistry {
    factories: DashMap<StoreKind, Arc<dyn BackendFactory>>,
}

impl BackendRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in file backend.
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(StoreKind::File, Arc::new(FileBackendFactory));
        registry
    }

    /// Registers `factory` for `kind`, replacing any previous one.
    pub fn register(&self, kind: StoreKind, factory: Arc<dyn BackendFactory>) {
        tracing::debug!(kind = %kind, factory = factory.id(), "Registering backend factory");
        self.factories.insert(kind, factory);
    }

    /// Checks if a factory is registered for `kind`.
    #[must_use]
    pub fn has_backend(&self, kind: &StoreKind) -> bool {
        self.factories.contains_key(kind)
    }

    /// Returns the number of registered factories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns whether no factory is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Opens the backend for `config`.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigError::MissingBackend`] if the kind is unregistered,
    /// or the backend's own error if it fails to open.
    pub async fn open(&self, config: &StoreConfiguration) -> ManagerResult<Arc<dyn IdentityStore>> {
        // Clone out of the map so no shard lock is held across the await.
        let factory = self
            .factories
            .get(config.kind())
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ConfigError::MissingBackend {
                kind: config.kind().to_string(),
            })?;

        Ok(factory.create(config).await?)
    }
}
