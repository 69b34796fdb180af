//! The identity configuration builder and the frozen runtime topology.

use std::collections::HashMap;
use std::sync::Arc;

use idm_model::{IdentityKind, RelationshipKind};
use idm_spi::{ContextFactory, ContextInitializer, DefaultContextFactory};

use crate::auto::AutoConfigurationResolver;
use crate::error::{ConfigError, ConfigResult};
use crate::feature::FeatureSet;
use crate::store::{StoreConfiguration, StoreKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Frozen,
}

/// Ordered store configurations plus the hooks shared between them.
///
/// Stores are consulted in insertion order: the first one supporting an
/// operation serves it. The builder accepts mutations until
/// [`IdentityConfiguration::build`] succeeds, after which it is frozen.
#[derive(Debug)]
pub struct IdentityConfiguration {
    stores: Vec<StoreConfiguration>,
    context_factory: Option<Arc<dyn ContextFactory>>,
    initializers: HashMap<StoreKind, Arc<dyn ContextInitializer>>,
    state: State,
}

impl IdentityConfiguration {
    /// Creates an empty, open configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stores: Vec::new(),
            context_factory: None,
            initializers: HashMap::new(),
            state: State::Open,
        }
    }

    fn ensure_open(&self, operation: &'static str) -> ConfigResult<()> {
        match self.state {
            State::Open => Ok(()),
            State::Frozen => Err(ConfigError::Frozen { operation }),
        }
    }

    /// Appends a store configuration.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigError::Frozen`] after build.
    pub fn add_config(&mut self, store: StoreConfiguration) -> ConfigResult<&mut Self> {
        self.ensure_open("add a store configuration")?;
        self.stores.push(store);
        Ok(self)
    }

    /// Sets the context factory shared by every store.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigError::Frozen`] after build.
    pub fn context_factory(&mut self, factory: Arc<dyn ContextFactory>) -> ConfigResult<&mut Self> {
        self.ensure_open("set the context factory")?;
        self.context_factory = Some(factory);
        Ok(self)
    }

    /// Registers the context initializer for stores of `kind`.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigError::Frozen`] after build.
    pub fn context_initializer(
        &mut self,
        kind: StoreKind,
        initializer: Arc<dyn ContextInitializer>,
    ) -> ConfigResult<&mut Self> {
        self.ensure_open("register a context initializer")?;
        self.initializers.insert(kind, initializer);
        Ok(self)
    }

    /// Store configurations declared so far.
    #[must_use]
    pub fn configured_stores(&self) -> &[StoreConfiguration] {
        &self.stores
    }

    /// Whether `build()` has succeeded.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.state == State::Frozen
    }

    /// Builds with the in-memory fallback resolver.
    ///
    /// ## Errors
    ///
    /// See [`IdentityConfiguration::build_with`].
    pub fn build(&mut self) -> ConfigResult<RuntimeTopology> {
        self.build_with(&AutoConfigurationResolver::default())
    }

    /// Validates the configuration and freezes it into a [`RuntimeTopology`].
    ///
    /// Auto-configures a store through `resolver` when none was declared,
    /// attaches initializers and the context factory, validates every
    /// store and merges their feature sets. On failure the configuration
    /// is left open and unchanged.
    ///
    /// ## Errors
    ///
    /// - [`ConfigError::AlreadyBuilt`] on a second call
    /// - [`ConfigError::MissingContextInitializer`] when a store needs one
    /// - [`ConfigError::InvalidStore`] for invalid settings
    /// - [`ConfigError::FeatureConflict`] for opposite claims between stores
    /// - probe failures from the resolver
    pub fn build_with(&mut self, resolver: &AutoConfigurationResolver) -> ConfigResult<RuntimeTopology> {
        if self.is_frozen() {
            return Err(ConfigError::AlreadyBuilt);
        }

        let mut stores = self.stores.clone();
        if stores.is_empty() {
            stores.push(resolver.resolve()?);
        }

        for store in &mut stores {
            match self.initializers.get(store.kind()) {
                Some(initializer) => store.add_context_initializer(Arc::clone(initializer)),
                None if store.requires_context_initializer() => {
                    return Err(ConfigError::MissingContextInitializer {
                        store: store.name().to_string(),
                    });
                }
                None => {}
            }
        }

        let context_factory: Arc<dyn ContextFactory> = self
            .context_factory
            .clone()
            .unwrap_or_else(|| Arc::new(DefaultContextFactory::default()));
        for store in &mut stores {
            store.set_context_factory(Arc::clone(&context_factory));
        }

        for store in &stores {
            store.validate()?;
        }
        let features = merge_features(&stores)?;

        tracing::info!(
            stores = ?stores.iter().map(StoreConfiguration::name).collect::<Vec<_>>(),
            multi_realm = features.supports_multi_realm(),
            "Identity configuration built"
        );

        self.stores.clone_from(&stores);
        self.state = State::Frozen;

        Ok(RuntimeTopology {
            inner: Arc::new(TopologyInner {
                stores,
                features,
                context_factory,
            }),
        })
    }
}

impl Default for IdentityConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_features(stores: &[StoreConfiguration]) -> ConfigResult<FeatureSet> {
    for (i, first) in stores.iter().enumerate() {
        for second in &stores[i + 1..] {
            if let Some(capability) = first.features().conflict_with(second.features()) {
                return Err(ConfigError::FeatureConflict {
                    capability: capability.to_string(),
                    first: first.name().to_string(),
                    second: second.name().to_string(),
                });
            }
        }
    }

    stores
        .iter()
        .try_fold(FeatureSet::new(), |merged, store| {
            merged.merge_named("merged features", store.features(), store.name())
        })
}

#[derive(Debug)]
struct TopologyInner {
    stores: Vec<StoreConfiguration>,
    features: FeatureSet,
    context_factory: Arc<dyn ContextFactory>,
}

/// Immutable snapshot produced by a successful build.
///
/// Cheap to clone; every clone shares the same stores.
#[derive(Debug, Clone)]
pub struct RuntimeTopology {
    inner: Arc<TopologyInner>,
}

impl RuntimeTopology {
    /// Stores in dispatch order.
    #[must_use]
    pub fn stores(&self) -> &[StoreConfiguration] {
        &self.inner.stores
    }

    /// Union of every store's feature set.
    #[must_use]
    pub fn features(&self) -> &FeatureSet {
        &self.inner.features
    }

    /// Context factory shared by every store.
    #[must_use]
    pub fn context_factory(&self) -> &Arc<dyn ContextFactory> {
        &self.inner.context_factory
    }

    /// First store supporting `kind`, with its position.
    #[must_use]
    pub fn store_for_identity(&self, kind: IdentityKind) -> Option<(usize, &StoreConfiguration)> {
        self.stores()
            .iter()
            .enumerate()
            .find(|(_, store)| store.features().supports_identity(kind))
    }

    /// First store supporting `kind`, with its position.
    #[must_use]
    pub fn store_for_relationship(&self, kind: &RelationshipKind) -> Option<(usize, &StoreConfiguration)> {
        self.stores()
            .iter()
            .enumerate()
            .find(|(_, store)| store.features().supports_relationship(kind))
    }
}
