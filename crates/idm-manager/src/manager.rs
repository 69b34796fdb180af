//! The identity manager facade and its dispatching implementation.

use std::sync::Arc;

use async_trait::async_trait;
use idm_config::{RuntimeTopology, StoreConfiguration};
use idm_model::relationship::{ASSIGNEE, GROUP, MEMBER, ROLE};
use idm_model::{
    Agent, Group, Identity, IdentityKind, IdentityType, Relationship, RelationshipKind,
    RelationshipQuery, Role, User, parse_key,
};
use idm_spi::{IdentityContext, SpiError};
use idm_storage::{IdentityStore, StorageError};

use crate::error::{IdentityManagerError, ManagerResult};

/// Identity participating in a relationship helper call.
pub type Participant<'a> = &'a (dyn IdentityType + Sync);

/// Single entry point for identity operations.
///
/// Callers never learn which store serves a call. Lookups report absence as
/// `Ok(None)`; updating or removing a missing entity is
/// [`IdentityManagerError::NotFound`].
///
/// The relationship helpers (`add_to_group`, `grant_role`, ...) are built on
/// the three relationship primitives, so decorators see each primitive call.
#[async_trait]
pub trait IdentityManager: Send + Sync {
    /// Context this manager is bound to.
    fn context(&self) -> &IdentityContext;

    // === Users ===

    /// Creates a user.
    async fn create_user(&self, user: &User) -> ManagerResult<()>;

    /// Gets a user by login name.
    async fn get_user(&self, login_name: &str) -> ManagerResult<Option<User>>;

    /// Replaces a stored user.
    async fn update_user(&self, user: &User) -> ManagerResult<()>;

    /// Removes a user.
    async fn remove_user(&self, user: &User) -> ManagerResult<()>;

    // === Groups ===

    /// Creates a group. Its parent must already exist in the serving store.
    async fn create_group(&self, group: &Group) -> ManagerResult<()>;

    /// Gets a group by name, with its parent chain.
    async fn get_group(&self, name: &str) -> ManagerResult<Option<Group>>;

    /// Gets a group by path, e.g. `/parent/child`.
    async fn get_group_by_path(&self, path: &str) -> ManagerResult<Option<Group>>;

    /// Replaces a stored group.
    async fn update_group(&self, group: &Group) -> ManagerResult<()>;

    /// Removes a group.
    async fn remove_group(&self, group: &Group) -> ManagerResult<()>;

    /// Lists direct children of `group`.
    async fn get_child_groups(&self, group: &Group) -> ManagerResult<Vec<Group>>;

    // === Roles ===

    /// Creates a role.
    async fn create_role(&self, role: &Role) -> ManagerResult<()>;

    /// Gets a role by name.
    async fn get_role(&self, name: &str) -> ManagerResult<Option<Role>>;

    /// Replaces a stored role.
    async fn update_role(&self, role: &Role) -> ManagerResult<()>;

    /// Removes a role.
    async fn remove_role(&self, role: &Role) -> ManagerResult<()>;

    // === Agents ===

    /// Creates an agent.
    async fn create_agent(&self, agent: &Agent) -> ManagerResult<()>;

    /// Gets an agent by login name.
    async fn get_agent(&self, login_name: &str) -> ManagerResult<Option<Agent>>;

    /// Replaces a stored agent.
    async fn update_agent(&self, agent: &Agent) -> ManagerResult<()>;

    /// Removes an agent.
    async fn remove_agent(&self, agent: &Agent) -> ManagerResult<()>;

    // === Relationships ===

    /// Stores a relationship.
    async fn add_relationship(&self, relationship: &Relationship) -> ManagerResult<()>;

    /// Removes a relationship.
    async fn remove_relationship(&self, relationship: &Relationship) -> ManagerResult<()>;

    /// Lists relationships matching `query`.
    async fn get_relationships(&self, query: &RelationshipQuery) -> ManagerResult<Vec<Relationship>>;

    /// Resolves any identity from its key, e.g. `GROUP:///a/b`.
    async fn lookup_identity_by_key(&self, key: &str) -> ManagerResult<Option<Identity>>;

    // === Relationship helpers ===

    /// Makes `member` a member of `group`. Returns the existing membership
    /// if there already is one.
    async fn add_to_group(&self, member: Participant<'_>, group: &Group) -> ManagerResult<Relationship> {
        let query = membership_query(member, group);
        ensure_relationship(self, &query, || Relationship::group_membership(member, group)).await
    }

    /// Ends the membership of `member` in `group`. Returns whether one existed.
    async fn remove_from_group(&self, member: Participant<'_>, group: &Group) -> ManagerResult<bool> {
        remove_matching(self, &membership_query(member, group)).await
    }

    /// Whether `member` is a direct member of `group`.
    async fn is_member(&self, member: Participant<'_>, group: &Group) -> ManagerResult<bool> {
        Ok(!self.get_relationships(&membership_query(member, group)).await?.is_empty())
    }

    /// Grants `role` to `assignee`.
    async fn grant_role(&self, assignee: Participant<'_>, role: &Role) -> ManagerResult<Relationship> {
        let query = grant_query(assignee, role);
        ensure_relationship(self, &query, || Relationship::grant(assignee, role)).await
    }

    /// Revokes `role` from `assignee`. Returns whether a grant existed.
    async fn revoke_role(&self, assignee: Participant<'_>, role: &Role) -> ManagerResult<bool> {
        remove_matching(self, &grant_query(assignee, role)).await
    }

    /// Whether `assignee` was granted `role`.
    async fn has_role(&self, assignee: Participant<'_>, role: &Role) -> ManagerResult<bool> {
        Ok(!self.get_relationships(&grant_query(assignee, role)).await?.is_empty())
    }

    /// Grants `role` to `assignee` within `group`.
    async fn grant_group_role(
        &self,
        assignee: Participant<'_>,
        group: &Group,
        role: &Role,
    ) -> ManagerResult<Relationship> {
        let query = group_role_query(assignee, group, role);
        ensure_relationship(self, &query, || Relationship::group_role(assignee, group, role)).await
    }

    /// Revokes `role` within `group` from `assignee`.
    async fn revoke_group_role(&self, assignee: Participant<'_>, group: &Group, role: &Role) -> ManagerResult<bool> {
        remove_matching(self, &group_role_query(assignee, group, role)).await
    }

    /// Whether `assignee` holds `role` within `group`.
    async fn has_group_role(&self, assignee: Participant<'_>, group: &Group, role: &Role) -> ManagerResult<bool> {
        let query = group_role_query(assignee, group, role);
        Ok(!self.get_relationships(&query).await?.is_empty())
    }
}

fn membership_query(member: Participant<'_>, group: &Group) -> RelationshipQuery {
    RelationshipQuery::of_kind(RelationshipKind::GroupMembership)
        .with_identity(MEMBER, member.key())
        .with_identity(GROUP, group.key())
}

fn grant_query(assignee: Participant<'_>, role: &Role) -> RelationshipQuery {
    RelationshipQuery::of_kind(RelationshipKind::Grant)
        .with_identity(ASSIGNEE, assignee.key())
        .with_identity(ROLE, role.key())
}

fn group_role_query(assignee: Participant<'_>, group: &Group, role: &Role) -> RelationshipQuery {
    RelationshipQuery::of_kind(RelationshipKind::GroupRole)
        .with_identity(ASSIGNEE, assignee.key())
        .with_identity(GROUP, group.key())
        .with_identity(ROLE, role.key())
}

async fn ensure_relationship<M, F>(manager: &M, query: &RelationshipQuery, build: F) -> ManagerResult<Relationship>
where
    M: IdentityManager + ?Sized,
    F: FnOnce() -> Relationship + Send,
{
    if let Some(existing) = manager.get_relationships(query).await?.into_iter().next() {
        return Ok(existing);
    }
    let relationship = build();
    manager.add_relationship(&relationship).await?;
    Ok(relationship)
}

async fn remove_matching<M>(manager: &M, query: &RelationshipQuery) -> ManagerResult<bool>
where
    M: IdentityManager + ?Sized,
{
    let matching = manager.get_relationships(query).await?;
    for relationship in &matching {
        manager.remove_relationship(relationship).await?;
    }
    Ok(!matching.is_empty())
}

/// Facade dispatching every call to the first store that supports it.
///
/// Bound to one scope; create a new one per unit of work through
/// [`crate::IdentityManagerFactory::create_identity_manager`].
pub struct DefaultIdentityManager {
    topology: RuntimeTopology,
    backends: Arc<[Arc<dyn IdentityStore>]>,
    context: IdentityContext,
}

impl DefaultIdentityManager {
    pub(crate) const fn new(
        topology: RuntimeTopology,
        backends: Arc<[Arc<dyn IdentityStore>]>,
        context: IdentityContext,
    ) -> Self {
        Self {
            topology,
            backends,
            context,
        }
    }

    /// Closes the bound context; later calls fail.
    pub fn close(&self) {
        self.context.close();
    }

    /// Checks the realm and runs the store's initializers once for this scope.
    async fn prepare(&self, index: usize, config: &StoreConfiguration) -> ManagerResult<&dyn IdentityStore> {
        if self.context.is_closed() {
            return Err(SpiError::ContextClosed(self.context.id()).into());
        }

        if !self.context.is_default_realm() && !config.features().supports_multi_realm() {
            return Err(IdentityManagerError::unsupported(format!(
                "realm '{}' on store '{}' without multi-realm support",
                self.context.realm(),
                config.name()
            )));
        }

        let context = &self.context;
        for (position, initializer) in config.context_initializers().iter().enumerate() {
            context
                .initialize_once(index, position, || async move {
                    tracing::debug!(
                        store = %config.name(),
                        initializer = initializer.name(),
                        context = %context.id(),
                        "Running context initializer"
                    );
                    initializer.initialize(context, config.name()).await
                })
                .await?;
        }

        match self.backends.get(index) {
            Some(backend) => Ok(&**backend),
            None => Err(IdentityManagerError::from(StorageError::Internal(format!(
                "no backend opened for store '{}'",
                config.name()
            )))),
        }
    }

    async fn identity_store(&self, kind: IdentityKind) -> ManagerResult<&dyn IdentityStore> {
        let (index, config) = self
            .topology
            .store_for_identity(kind)
            .ok_or_else(|| IdentityManagerError::unsupported(format!("identity type '{kind}'")))?;

        tracing::debug!(store = %config.name(), kind = %kind, realm = %self.context.realm(), "Dispatching");
        self.prepare(index, config).await
    }

    async fn relationship_store(&self, kind: &RelationshipKind) -> ManagerResult<&dyn IdentityStore> {
        let (index, config) = self
            .topology
            .store_for_relationship(kind)
            .ok_or_else(|| IdentityManagerError::unsupported(format!("relationship type '{kind}'")))?;

        tracing::debug!(store = %config.name(), relationship = %kind, realm = %self.context.realm(), "Dispatching");
        self.prepare(index, config).await
    }

    async fn create_identity(&self, identity: &Identity) -> ManagerResult<()> {
        identity.validate()?;
        let store = self.identity_store(identity.kind()).await?;

        if let Identity::Group(group) = identity {
            if let Some(parent) = group.parent_key() {
                let found = store.get_by_key(&self.context, &parent).await?;
                if !matches!(found, Some(Identity::Group(_))) {
                    return Err(IdentityManagerError::ParentNotFound { parent });
                }
            }
        }

        store.create(&self.context, identity).await?;
        tracing::debug!(key = %identity.key(), realm = %self.context.realm(), "Identity created");
        Ok(())
    }

    async fn update_identity(&self, identity: &Identity) -> ManagerResult<()> {
        identity.validate()?;
        let store = self.identity_store(identity.kind()).await?;
        store.update(&self.context, identity).await?;
        Ok(())
    }

    async fn remove_identity(&self, kind: IdentityKind, key: &str) -> ManagerResult<()> {
        let store = self.identity_store(kind).await?;

        if kind == IdentityKind::Group && !store.supports_cascade() {
            let children = store.get_child_groups(&self.context, key).await?;
            if !children.is_empty() {
                return Err(IdentityManagerError::HasChildren {
                    key: key.to_string(),
                    children: children.len(),
                });
            }
        }

        store.remove(&self.context, kind, key).await?;
        tracing::debug!(key = %key, realm = %self.context.realm(), "Identity removed");
        Ok(())
    }
}

impl std::fmt::Debug for DefaultIdentityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultIdentityManager")
            .field("context", &self.context.id())
            .field("realm", &self.context.realm())
            .field("stores", &self.backends.len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl IdentityManager for DefaultIdentityManager {
    fn context(&self) -> &IdentityContext {
        &self.context
    }

    async fn create_user(&self, user: &User) -> ManagerResult<()> {
        self.create_identity(&Identity::User(user.clone())).await
    }

    async fn get_user(&self, login_name: &str) -> ManagerResult<Option<User>> {
        let store = self.identity_store(IdentityKind::User).await?;
        Ok(store.get_user(&self.context, login_name).await?)
    }

    async fn update_user(&self, user: &User) -> ManagerResult<()> {
        self.update_identity(&Identity::User(user.clone())).await
    }

    async fn remove_user(&self, user: &User) -> ManagerResult<()> {
        self.remove_identity(IdentityKind::User, &user.key()).await
    }

    async fn create_group(&self, group: &Group) -> ManagerResult<()> {
        self.create_identity(&Identity::Group(group.clone())).await
    }

    async fn get_group(&self, name: &str) -> ManagerResult<Option<Group>> {
        let store = self.identity_store(IdentityKind::Group).await?;
        Ok(store.get_group(&self.context, name).await?)
    }

    async fn get_group_by_path(&self, path: &str) -> ManagerResult<Option<Group>> {
        let store = self.identity_store(IdentityKind::Group).await?;
        Ok(store.get_group_by_path(&self.context, path).await?)
    }

    async fn update_group(&self, group: &Group) -> ManagerResult<()> {
        self.update_identity(&Identity::Group(group.clone())).await
    }

    async fn remove_group(&self, group: &Group) -> ManagerResult<()> {
        self.remove_identity(IdentityKind::Group, &group.key()).await
    }

    async fn get_child_groups(&self, group: &Group) -> ManagerResult<Vec<Group>> {
        let store = self.identity_store(IdentityKind::Group).await?;
        Ok(store.get_child_groups(&self.context, &group.key()).await?)
    }

    async fn create_role(&self, role: &Role) -> ManagerResult<()> {
        self.create_identity(&Identity::Role(role.clone())).await
    }

    async fn get_role(&self, name: &str) -> ManagerResult<Option<Role>> {
        let store = self.identity_store(IdentityKind::Role).await?;
        Ok(store.get_role(&self.context, name).await?)
    }

    async fn update_role(&self, role: &Role) -> ManagerResult<()> {
        self.update_identity(&Identity::Role(role.clone())).await
    }

    async fn remove_role(&self, role: &Role) -> ManagerResult<()> {
        self.remove_identity(IdentityKind::Role, &role.key()).await
    }

    async fn create_agent(&self, agent: &Agent) -> ManagerResult<()> {
        self.create_identity(&Identity::Agent(agent.clone())).await
    }

    async fn get_agent(&self, login_name: &str) -> ManagerResult<Option<Agent>> {
        let store = self.identity_store(IdentityKind::Agent).await?;
        Ok(store.get_agent(&self.context, login_name).await?)
    }

    async fn update_agent(&self, agent: &Agent) -> ManagerResult<()> {
        self.update_identity(&Identity::Agent(agent.clone())).await
    }

    async fn remove_agent(&self, agent: &Agent) -> ManagerResult<()> {
        self.remove_identity(IdentityKind::Agent, &agent.key()).await
    }

    async fn add_relationship(&self, relationship: &Relationship) -> ManagerResult<()> {
        let store = self.relationship_store(&relationship.kind).await?;
        store.add_relationship(&self.context, relationship).await?;
        Ok(())
    }

    async fn remove_relationship(&self, relationship: &Relationship) -> ManagerResult<()> {
        let store = self.relationship_store(&relationship.kind).await?;
        store.remove_relationship(&self.context, relationship.id).await?;
        Ok(())
    }

    async fn get_relationships(&self, query: &RelationshipQuery) -> ManagerResult<Vec<Relationship>> {
        if let Some(kind) = &query.kind {
            let store = self.relationship_store(kind).await?;
            return Ok(store.get_relationships(&self.context, query).await?);
        }

        // Without a kind every store holding relationships is asked.
        let mut found = Vec::new();
        let mut asked = 0;
        for (index, config) in self.topology.stores().iter().enumerate() {
            let features = config.features();
            let holds_relationships = features.supports_custom_relationships()
                || RelationshipKind::standard()
                    .iter()
                    .any(|kind| features.supports_relationship(kind));
            if !holds_relationships {
                continue;
            }
            let store = self.prepare(index, config).await?;
            found.extend(store.get_relationships(&self.context, query).await?);
            asked += 1;
        }

        if asked == 0 {
            return Err(IdentityManagerError::unsupported("relationships"));
        }
        Ok(found)
    }

    async fn lookup_identity_by_key(&self, key: &str) -> ManagerResult<Option<Identity>> {
        let (kind, _) = parse_key(key).map_err(|_| IdentityManagerError::InvalidKey(key.to_string()))?;
        let store = self.identity_store(kind).await?;
        Ok(store.get_by_key(&self.context, key).await?)
    }
}
