//! Common test utilities and fixtures.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use idm_config::{StoreConfiguration, StoreKind};
use idm_manager::{
    BackendFactory, BackendRegistry, DefaultIdentityManager, IdentityManagerProducer,
    SecuredIdentityManager,
};
use idm_model::{Group, Identity, IdentityKind, Relationship, RelationshipQuery};
use idm_spi::{ContextInitializer, IdentityContext, Scope, SpiError};
use idm_storage::{IdentityStore, StorageResult};
use idm_store_file::FileIdentityStore;
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Kind under which [`RecordingFactory`] is registered.
pub const RECORDING: &str = "recording";

/// Initializes tracing once for the test binary.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("idm_manager=debug,idm_config=info,idm_store_file=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Builds a producer with default settings and returns a manager for the
/// default realm.
pub async fn default_manager() -> anyhow::Result<SecuredIdentityManager<DefaultIdentityManager>> {
    init_tracing();
    let producer = IdentityManagerProducer::builder().init().await?;
    Ok(producer.create_identity_manager(&Scope::new()))
}

/// Shared log of `(store, operation)` pairs.
pub type CallLog = Arc<Mutex<Vec<(String, &'static str)>>>;

/// Opens in-memory stores that record every call they serve.
#[derive(Debug, Default)]
pub struct RecordingFactory {
    pub log: CallLog,
}

impl RecordingFactory {
    /// Registry serving both file and recording kinds.
    /// Relational stores are served by this factory too.
    pub fn registry(factory: &Arc<Self>) -> BackendRegistry {
        let registry = BackendRegistry::with_defaults();
        registry.register(StoreKind::Custom(RECORDING.to_string()), Arc::clone(factory) as Arc<dyn BackendFactory>);
        registry.register(StoreKind::Jpa, Arc::clone(factory) as Arc<dyn BackendFactory>);
        registry
    }

    /// Store configuration served by this factory.
    pub fn store(name: &str) -> StoreConfiguration {
        StoreConfiguration::custom(RECORDING, BTreeMap::new()).with_name(name)
    }

    /// Store names that served `operation`, in call order.
    pub fn served(&self, operation: &str) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .filter(|(_, op)| *op == operation)
            .map(|(store, _)| store.clone())
            .collect()
    }
}

#[async_trait]
impl BackendFactory for RecordingFactory {
    fn id(&self) -> &'static str {
        RECORDING
    }

    async fn create(&self, config: &StoreConfiguration) -> StorageResult<Arc<dyn IdentityStore>> {
        Ok(Arc::new(RecordingStore {
            name: config.name().to_string(),
            inner: FileIdentityStore::in_memory(),
            log: Arc::clone(&self.log),
        }))
    }
}

/// Store forwarding to an in-memory file store while logging calls.
pub struct RecordingStore {
    name: String,
    inner: FileIdentityStore,
    log: CallLog,
}

impl RecordingStore {
    fn note(&self, operation: &'static str) {
        self.log.lock().push((self.name.clone(), operation));
    }
}

#[async_trait]
impl IdentityStore for RecordingStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create(&self, context: &IdentityContext, identity: &Identity) -> StorageResult<()> {
        self.note("create");
        self.inner.create(context, identity).await
    }

    async fn update(&self, context: &IdentityContext, identity: &Identity) -> StorageResult<()> {
        self.note("update");
        self.inner.update(context, identity).await
    }

    async fn remove(&self, context: &IdentityContext, kind: IdentityKind, key: &str) -> StorageResult<()> {
        self.note("remove");
        self.inner.remove(context, kind, key).await
    }

    async fn get_by_key(&self, context: &IdentityContext, key: &str) -> StorageResult<Option<Identity>> {
        self.note("get_by_key");
        self.inner.get_by_key(context, key).await
    }

    async fn get_group(&self, context: &IdentityContext, name: &str) -> StorageResult<Option<Group>> {
        self.note("get_group");
        self.inner.get_group(context, name).await
    }

    async fn get_child_groups(&self, context: &IdentityContext, parent_key: &str) -> StorageResult<Vec<Group>> {
        self.note("get_child_groups");
        self.inner.get_child_groups(context, parent_key).await
    }

    async fn add_relationship(&self, context: &IdentityContext, relationship: &Relationship) -> StorageResult<()> {
        self.note("add_relationship");
        self.inner.add_relationship(context, relationship).await
    }

    async fn remove_relationship(&self, context: &IdentityContext, id: Uuid) -> StorageResult<()> {
        self.note("remove_relationship");
        self.inner.remove_relationship(context, id).await
    }

    async fn get_relationships(
        &self,
        context: &IdentityContext,
        query: &RelationshipQuery,
    ) -> StorageResult<Vec<Relationship>> {
        self.note("get_relationships");
        self.inner.get_relationships(context, query).await
    }
}

/// Initializer counting how often it ran, per store.
#[derive(Debug, Default)]
pub struct CountingInitializer {
    runs: AtomicUsize,
    stores: Mutex<Vec<String>>,
}

impl CountingInitializer {
    /// Number of runs so far.
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    /// Stores prepared so far, in order.
    pub fn stores(&self) -> Vec<String> {
        self.stores.lock().clone()
    }
}

#[async_trait]
impl ContextInitializer for CountingInitializer {
    fn name(&self) -> &str {
        "counting"
    }

    async fn initialize(&self, context: &IdentityContext, store: &str) -> Result<(), SpiError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.stores.lock().push(store.to_string());
        context.set_attribute(format!("tx:{store}"), "bound");
        Ok(())
    }
}
