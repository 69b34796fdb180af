//! Process-level bootstrap of the identity runtime.

use std::sync::Arc;

use idm_config::{
    AutoConfigurationResolver, ConfigProbe, ConfigurationListener, ConfigurationSupply, FileSettings,
    IdentityConfiguration, ReadinessProbe, RuntimeTopology, StoreKind,
};
use idm_core::Config;
use idm_core::event::{Event, EventType};
use idm_spi::{ContextFactory, ContextInitializer, DefaultContextFactory, Scope};

use crate::error::ManagerResult;
use crate::factory::IdentityManagerFactory;
use crate::manager::DefaultIdentityManager;
use crate::registry::BackendRegistry;
use crate::secured::{AllowAll, AuditSink, SecuredIdentityManager, SecurityPolicy, TracingAuditSink};

/// Owns the factory for the lifetime of the process and hands out secured
/// identity managers.
#[derive(Debug)]
pub struct IdentityManagerProducer {
    factory: IdentityManagerFactory,
    policy: Arc<dyn SecurityPolicy>,
    audit: Arc<dyn AuditSink>,
}

impl IdentityManagerProducer {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> IdentityManagerProducerBuilder {
        IdentityManagerProducerBuilder::default()
    }

    /// The underlying factory.
    #[must_use]
    pub const fn factory(&self) -> &IdentityManagerFactory {
        &self.factory
    }

    /// The frozen topology.
    #[must_use]
    pub const fn topology(&self) -> &RuntimeTopology {
        self.factory.topology()
    }

    /// Creates a secured identity manager bound to `scope`.
    #[must_use]
    pub fn create_identity_manager(&self, scope: &Scope) -> SecuredIdentityManager<DefaultIdentityManager> {
        SecuredIdentityManager::new(
            self.factory.create_identity_manager(scope),
            Arc::clone(&self.policy),
            Arc::clone(&self.audit),
        )
    }
}

/// Collects the pieces the producer wires together.
pub struct IdentityManagerProducerBuilder {
    supply: ConfigurationSupply,
    listeners: Vec<Arc<dyn ConfigurationListener>>,
    context_factory: Option<Arc<dyn ContextFactory>>,
    jpa_initializer: Option<Arc<dyn ContextInitializer>>,
    probe: Option<Arc<dyn ReadinessProbe>>,
    runtime: Config,
    registry: BackendRegistry,
    policy: Arc<dyn SecurityPolicy>,
    audit: Arc<dyn AuditSink>,
}

impl Default for IdentityManagerProducerBuilder {
    fn default() -> Self {
        Self {
            supply: ConfigurationSupply::None,
            listeners: Vec::new(),
            context_factory: None,
            jpa_initializer: None,
            probe: None,
            runtime: Config::default(),
            registry: BackendRegistry::with_defaults(),
            policy: Arc::new(AllowAll),
            audit: Arc::new(TracingAuditSink),
        }
    }
}

impl IdentityManagerProducerBuilder {
    /// Sets what discovery found.
    #[must_use]
    pub fn supply(mut self, supply: ConfigurationSupply) -> Self {
        self.supply = supply;
        self
    }

    /// Supplies exactly one configuration.
    #[must_use]
    pub fn configuration(self, configuration: IdentityConfiguration) -> Self {
        self.supply(ConfigurationSupply::One(configuration))
    }

    /// Adds a configuration-resolved listener.
    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn ConfigurationListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Sets the context factory. Defaults to one using the runtime's default realm.
    #[must_use]
    pub fn context_factory(mut self, factory: Arc<dyn ContextFactory>) -> Self {
        self.context_factory = Some(factory);
        self
    }

    /// Sets the initializer bound to every relational store.
    #[must_use]
    pub fn jpa_context_initializer(mut self, initializer: Arc<dyn ContextInitializer>) -> Self {
        self.jpa_initializer = Some(initializer);
        self
    }

    /// Sets the readiness probe used by auto-configuration.
    #[must_use]
    pub fn readiness_probe(mut self, probe: Arc<dyn ReadinessProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Sets the runtime settings (default realm, file store, relational probe).
    #[must_use]
    pub fn runtime_config(mut self, config: Config) -> Self {
        self.runtime = config;
        self
    }

    /// Replaces the backend registry.
    #[must_use]
    pub fn backend_registry(mut self, registry: BackendRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Sets the security policy.
    #[must_use]
    pub fn security_policy(mut self, policy: Arc<dyn SecurityPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the audit sink.
    #[must_use]
    pub fn audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Resolves, builds and opens everything.
    ///
    /// ## Errors
    ///
    /// Returns a configuration error if the supply is ambiguous, a listener
    /// rejects the configuration or the build fails, and a backend error if
    /// a store can not be opened.
    pub async fn init(self) -> ManagerResult<IdentityManagerProducer> {
        let mut configuration = self.supply.resolve()?;

        for listener in &self.listeners {
            tracing::debug!(listener = listener.name(), "Notifying configuration listener");
            listener.on_configuration_resolved(&mut configuration)?;
        }
        self.audit.record(
            Event::builder(EventType::ConfigurationResolved)
                .detail("stores", configuration.configured_stores().len().to_string())
                .detail("listeners", self.listeners.len().to_string())
                .build(),
        );

        if let Some(initializer) = self.jpa_initializer {
            configuration.context_initializer(StoreKind::Jpa, initializer)?;
        }
        let context_factory = self
            .context_factory
            .unwrap_or_else(|| Arc::new(DefaultContextFactory::new(self.runtime.default_realm.clone())));
        configuration.context_factory(context_factory)?;

        let probe = self
            .probe
            .unwrap_or_else(|| Arc::new(ConfigProbe::new(&self.runtime)));
        let resolver = AutoConfigurationResolver::new(probe, FileSettings::from(&self.runtime.file_store));
        let topology = configuration.build_with(&resolver)?;

        let factory = IdentityManagerFactory::new(topology, &self.registry).await?;

        Ok(IdentityManagerProducer {
            factory,
            policy: self.policy,
            audit: self.audit,
        })
    }
}
