//! Identity execution context.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::OnceCell;
use uuid::Uuid;

/// Caller-supplied scoping information.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    /// Realm to operate in. `None` means the default realm.
    pub realm: Option<String>,
    /// Tenant the call is made for.
    pub tenant: Option<String>,
}

impl Scope {
    /// Scope addressing the default realm.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope addressing a specific realm.
    #[must_use]
    pub fn realm(realm: impl Into<String>) -> Self {
        Self {
            realm: Some(realm.into()),
            tenant: None,
        }
    }

    /// Sets the tenant.
    #[must_use]
    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }
}

/// An identity context represents one unit of work.
///
/// It carries the resolved realm, scratch attributes for context
/// initializers, and the bookkeeping that keeps each initializer of each
/// store from running more than once in the scope.
#[derive(Debug)]
pub struct IdentityContext {
    /// Unique context identifier.
    id: Uuid,

    /// Realm the context operates in.
    realm: String,

    /// Whether `realm` is the runtime's default realm.
    default_realm: bool,

    /// Tenant, if any.
    tenant: Option<String>,

    /// Context attributes.
    attributes: RwLock<HashMap<String, String>>,

    /// One cell per (store, initializer) pair touched in this scope.
    initialized: RwLock<HashMap<(usize, usize), Arc<OnceCell<()>>>>,

    /// Whether this context has been closed.
    closed: RwLock<bool>,
}

impl IdentityContext {
    /// Creates a new context.
    #[must_use]
    pub fn new(realm: impl Into<String>, default_realm: bool, tenant: Option<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            realm: realm.into(),
            default_realm,
            tenant,
            attributes: RwLock::new(HashMap::new()),
            initialized: RwLock::new(HashMap::new()),
            closed: RwLock::new(false),
        }
    }

    /// Returns the context ID.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the realm.
    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Returns whether the context addresses the default realm.
    #[must_use]
    pub const fn is_default_realm(&self) -> bool {
        self.default_realm
    }

    /// Returns the tenant.
    #[must_use]
    pub fn tenant(&self) -> Option<&str> {
        self.tenant.as_deref()
    }

    /// Sets a context attribute.
    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.write().insert(key.into(), value.into());
    }

    /// Gets a context attribute.
    #[must_use]
    pub fn get_attribute(&self, key: &str) -> Option<String> {
        self.attributes.read().get(key).cloned()
    }

    /// Removes a context attribute.
    pub fn remove_attribute(&self, key: &str) -> Option<String> {
        self.attributes.write().remove(key)
    }

    /// Runs `init` as initializer `initializer_index` of the store at
    /// `store_index`, unless it already succeeded in this context.
    ///
    /// A failed initializer stays pending, so the next call in the same
    /// scope runs it again. Initializers that already succeeded are not
    /// repeated.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `init`.
    pub async fn initialize_once<F, Fut, E>(
        &self,
        store_index: usize,
        initializer_index: usize,
        init: F,
    ) -> Result<(), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let cell = {
            let mut cells = self.initialized.write();
            Arc::clone(cells.entry((store_index, initializer_index)).or_default())
        };
        cell.get_or_try_init(init).await.map(|_| ())
    }

    /// Returns whether initializer `initializer_index` of the store at
    /// `store_index` succeeded in this context.
    #[must_use]
    pub fn is_initialized(&self, store_index: usize, initializer_index: usize) -> bool {
        self.initialized
            .read()
            .get(&(store_index, initializer_index))
            .is_some_and(|cell| cell.initialized())
    }

    /// Returns whether the context has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.closed.read()
    }

    /// Closes the context.
    ///
    /// After closing, managers bound to this context refuse further calls.
    pub fn close(&self) {
        *self.closed.write() = true;
    }
}
