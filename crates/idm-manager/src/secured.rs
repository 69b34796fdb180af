//! Securing decorator for identity managers.
//!
//! Every call is checked against a [`SecurityPolicy`] before it reaches the
//! wrapped manager and produces exactly one audit [`Event`]. Results and
//! errors of the wrapped manager pass through unchanged.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use idm_core::event::{Event, EventType};
use idm_model::{Agent, Group, Identity, IdentityKind, IdentityType, Relationship, RelationshipQuery, Role, User};
use idm_spi::IdentityContext;
use parking_lot::RwLock;

use crate::error::{IdentityManagerError, ManagerResult};
use crate::manager::IdentityManager;

// ============================================================================
// Policy
// ============================================================================

/// A call about to be made through the facade.
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    /// Facade operation, e.g. `create_group`.
    pub operation: &'static str,
    /// Realm of the caller's scope.
    pub realm: &'a str,
    /// Tenant of the caller's scope.
    pub tenant: Option<&'a str>,
    /// Key of the identity or relationship involved, when known.
    pub subject: Option<&'a str>,
}

/// Outcome of a policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    /// The call may proceed.
    Permit,
    /// The call is rejected with a reason.
    Deny(String),
}

/// Decides whether a facade call may proceed.
pub trait SecurityPolicy: Send + Sync + std::fmt::Debug {
    /// Checks `request`.
    fn check(&self, request: &AccessRequest<'_>) -> PolicyDecision;
}

/// Policy permitting every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl SecurityPolicy for AllowAll {
    fn check(&self, _request: &AccessRequest<'_>) -> PolicyDecision {
        PolicyDecision::Permit
    }
}

// ============================================================================
// Audit
// ============================================================================

/// Receives one audit event per facade call.
pub trait AuditSink: Send + Sync + std::fmt::Debug {
    /// Records an event.
    fn record(&self, event: Event);
}

/// Audit sink writing events to the tracing framework at INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: Event) {
        tracing::info!(
            event_id = %event.id,
            event_type = ?event.event_type,
            outcome = ?event.outcome,
            operation = ?event.operation,
            realm = ?event.realm,
            subject = ?event.subject,
            error = ?event.error,
            "identity_event"
        );
    }
}

/// In-memory audit sink for testing.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    events: RwLock<Vec<Event>>,
}

impl InMemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    /// Clears all recorded events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: Event) {
        self.events.write().push(event);
    }
}

// ============================================================================
// Decorator
// ============================================================================

/// Identity manager checking a policy and auditing every call.
#[derive(Debug)]
pub struct SecuredIdentityManager<M> {
    inner: M,
    policy: Arc<dyn SecurityPolicy>,
    audit: Arc<dyn AuditSink>,
}

impl<M: IdentityManager> SecuredIdentityManager<M> {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: M, policy: Arc<dyn SecurityPolicy>, audit: Arc<dyn AuditSink>) -> Self {
        Self { inner, policy, audit }
    }

    /// Wraps `inner` with [`AllowAll`] and [`TracingAuditSink`].
    #[must_use]
    pub fn permissive(inner: M) -> Self {
        Self::new(inner, Arc::new(AllowAll), Arc::new(TracingAuditSink))
    }

    /// The wrapped manager.
    #[must_use]
    pub const fn inner(&self) -> &M {
        &self.inner
    }

    async fn guarded<T, F>(
        &self,
        operation: &'static str,
        event_type: EventType,
        subject: Option<String>,
        call: F,
    ) -> ManagerResult<T>
    where
        F: Future<Output = ManagerResult<T>> + Send,
    {
        let context = self.inner.context();
        let request = AccessRequest {
            operation,
            realm: context.realm(),
            tenant: context.tenant(),
            subject: subject.as_deref(),
        };

        let mut event = Event::builder(event_type)
            .operation(operation)
            .realm(context.realm());
        if let Some(subject) = &subject {
            event = event.subject(subject.clone());
        }

        if let PolicyDecision::Deny(reason) = self.policy.check(&request) {
            tracing::warn!(operation, realm = %context.realm(), subject = ?subject, reason = %reason, "Access denied");
            self.audit.record(event.denied(reason.clone()).build());
            return Err(IdentityManagerError::AccessDenied {
                operation: operation.to_string(),
                reason,
            });
        }

        let result = call.await;
        let event = match &result {
            Ok(_) => event.success(),
            Err(err) => event.failure(err.to_string()),
        };
        self.audit.record(event.build());
        result
    }
}

fn key_of(kind: IdentityKind, identifier: &str) -> Option<String> {
    Some(kind.key_for(identifier))
}

#[async_trait]
impl<M: IdentityManager> IdentityManager for SecuredIdentityManager<M> {
    fn context(&self) -> &IdentityContext {
        self.inner.context()
    }

    async fn create_user(&self, user: &User) -> ManagerResult<()> {
        self.guarded("create_user", EventType::IdentityCreated, Some(user.key()), self.inner.create_user(user))
            .await
    }

    async fn get_user(&self, login_name: &str) -> ManagerResult<Option<User>> {
        let subject = key_of(IdentityKind::User, login_name);
        self.guarded("get_user", EventType::IdentityRead, subject, self.inner.get_user(login_name))
            .await
    }

    async fn update_user(&self, user: &User) -> ManagerResult<()> {
        self.guarded("update_user", EventType::IdentityUpdated, Some(user.key()), self.inner.update_user(user))
            .await
    }

    async fn remove_user(&self, user: &User) -> ManagerResult<()> {
        self.guarded("remove_user", EventType::IdentityRemoved, Some(user.key()), self.inner.remove_user(user))
            .await
    }

    async fn create_group(&self, group: &Group) -> ManagerResult<()> {
        self.guarded("create_group", EventType::IdentityCreated, Some(group.key()), self.inner.create_group(group))
            .await
    }

    async fn get_group(&self, name: &str) -> ManagerResult<Option<Group>> {
        self.guarded("get_group", EventType::IdentityRead, None, self.inner.get_group(name))
            .await
    }

    async fn get_group_by_path(&self, path: &str) -> ManagerResult<Option<Group>> {
        let subject = key_of(IdentityKind::Group, path);
        self.guarded("get_group_by_path", EventType::IdentityRead, subject, self.inner.get_group_by_path(path))
            .await
    }

    async fn update_group(&self, group: &Group) -> ManagerResult<()> {
        self.guarded("update_group", EventType::IdentityUpdated, Some(group.key()), self.inner.update_group(group))
            .await
    }

    async fn remove_group(&self, group: &Group) -> ManagerResult<()> {
        self.guarded("remove_group", EventType::IdentityRemoved, Some(group.key()), self.inner.remove_group(group))
            .await
    }

    async fn get_child_groups(&self, group: &Group) -> ManagerResult<Vec<Group>> {
        self.guarded(
            "get_child_groups",
            EventType::IdentityRead,
            Some(group.key()),
            self.inner.get_child_groups(group),
        )
        .await
    }

    async fn create_role(&self, role: &Role) -> ManagerResult<()> {
        self.guarded("create_role", EventType::IdentityCreated, Some(role.key()), self.inner.create_role(role))
            .await
    }

    async fn get_role(&self, name: &str) -> ManagerResult<Option<Role>> {
        let subject = key_of(IdentityKind::Role, name);
        self.guarded("get_role", EventType::IdentityRead, subject, self.inner.get_role(name))
            .await
    }

    async fn update_role(&self, role: &Role) -> ManagerResult<()> {
        self.guarded("update_role", EventType::IdentityUpdated, Some(role.key()), self.inner.update_role(role))
            .await
    }

    async fn remove_role(&self, role: &Role) -> ManagerResult<()> {
        self.guarded("remove_role", EventType::IdentityRemoved, Some(role.key()), self.inner.remove_role(role))
            .await
    }

    async fn create_agent(&self, agent: &Agent) -> ManagerResult<()> {
        self.guarded("create_agent", EventType::IdentityCreated, Some(agent.key()), self.inner.create_agent(agent))
            .await
    }

    async fn get_agent(&self, login_name: &str) -> ManagerResult<Option<Agent>> {
        let subject = key_of(IdentityKind::Agent, login_name);
        self.guarded("get_agent", EventType::IdentityRead, subject, self.inner.get_agent(login_name))
            .await
    }

    async fn update_agent(&self, agent: &Agent) -> ManagerResult<()> {
        self.guarded("update_agent", EventType::IdentityUpdated, Some(agent.key()), self.inner.update_agent(agent))
            .await
    }

    async fn remove_agent(&self, agent: &Agent) -> ManagerResult<()> {
        self.guarded("remove_agent", EventType::IdentityRemoved, Some(agent.key()), self.inner.remove_agent(agent))
            .await
    }

    async fn add_relationship(&self, relationship: &Relationship) -> ManagerResult<()> {
        self.guarded(
            "add_relationship",
            EventType::RelationshipAdded,
            Some(relationship.key()),
            self.inner.add_relationship(relationship),
        )
        .await
    }

    async fn remove_relationship(&self, relationship: &Relationship) -> ManagerResult<()> {
        self.guarded(
            "remove_relationship",
            EventType::RelationshipRemoved,
            Some(relationship.key()),
            self.inner.remove_relationship(relationship),
        )
        .await
    }

    async fn get_relationships(&self, query: &RelationshipQuery) -> ManagerResult<Vec<Relationship>> {
        self.guarded(
            "get_relationships",
            EventType::RelationshipQueried,
            None,
            self.inner.get_relationships(query),
        )
        .await
    }

    async fn lookup_identity_by_key(&self, key: &str) -> ManagerResult<Option<Identity>> {
        self.guarded(
            "lookup_identity_by_key",
            EventType::IdentityRead,
            Some(key.to_string()),
            self.inner.lookup_identity_by_key(key),
        )
        .await
    }
}
