//! Identity manager factory.

use std::sync::Arc;

use idm_config::RuntimeTopology;
use idm_spi::Scope;
use idm_storage::IdentityStore;

use crate::error::ManagerResult;
use crate::manager::DefaultIdentityManager;
use crate::registry::BackendRegistry;

/// Holds the frozen topology and one open backend per configured store.
///
/// Creating managers is cheap: they share the topology and backends and
/// only get a fresh context of their own.
#[derive(Clone)]
pub struct IdentityManagerFactory {
    topology: RuntimeTopology,
    backends: Arc<[Arc<dyn IdentityStore>]>,
}

impl IdentityManagerFactory {
    /// Opens a backend for every store in `topology`.
    ///
    /// ## Errors
    ///
    /// Returns a configuration error if a store kind has no registered
    /// backend, or the backend's error if one fails to open.
    pub async fn new(topology: RuntimeTopology, registry: &BackendRegistry) -> ManagerResult<Self> {
        let mut backends = Vec::with_capacity(topology.stores().len());
        for config in topology.stores() {
            let backend = registry.open(config).await?;
            tracing::debug!(store = %config.name(), kind = %config.kind(), "Backend opened");
            backends.push(backend);
        }

        tracing::info!(stores = backends.len(), "Identity manager factory ready");

        Ok(Self {
            topology,
            backends: backends.into(),
        })
    }

    /// The topology this factory serves.
    #[must_use]
    pub const fn topology(&self) -> &RuntimeTopology {
        &self.topology
    }

    /// Creates a manager bound to `scope`.
    #[must_use]
    pub fn create_identity_manager(&self, scope: &Scope) -> DefaultIdentityManager {
        let context = self.topology.context_factory().create_context(scope);
        DefaultIdentityManager::new(self.topology.clone(), Arc::clone(&self.backends), context)
    }
}

impl std::fmt::Debug for IdentityManagerFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityManagerFactory")
            .field("topology", &self.topology)
            .field(
                "backends",
                &self.backends.iter().map(|b| b.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
