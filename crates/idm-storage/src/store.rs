//! Identity store trait.

use async_trait::async_trait;
use idm_model::{
    Agent, Group, GroupPath, Identity, IdentityKind, Relationship, RelationshipQuery, Role, User,
};
use idm_spi::IdentityContext;
use uuid::Uuid;

use crate::error::StorageResult;

/// A backend capable of persisting identities and relationships.
///
/// Implementations must be thread-safe and support concurrent access.
/// Every call receives the caller's [`IdentityContext`]; stores that keep
/// several realms apart partition their data by [`IdentityContext::realm`].
///
/// Lookups report absence as `Ok(None)`. Anything else that goes wrong is a
/// [`crate::StorageError`] and reaches the facade's caller unchanged.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Returns a name for logs and error messages.
    fn name(&self) -> &str;

    /// Whether removing a group also removes its descendants.
    fn supports_cascade(&self) -> bool {
        false
    }

    // === Identities ===

    /// Stores a new identity.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Duplicate` if an identity with the same key exists.
    async fn create(&self, context: &IdentityContext, identity: &Identity) -> StorageResult<()>;

    /// Replaces the stored identity that has the same key.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the identity doesn't exist.
    async fn update(&self, context: &IdentityContext, identity: &Identity) -> StorageResult<()>;

    /// Removes the identity with `key`.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the identity doesn't exist.
    async fn remove(&self, context: &IdentityContext, kind: IdentityKind, key: &str) -> StorageResult<()>;

    /// Gets an identity by key. Groups come back with their parent chain.
    async fn get_by_key(&self, context: &IdentityContext, key: &str) -> StorageResult<Option<Identity>>;

    /// Gets a user by login name.
    async fn get_user(&self, context: &IdentityContext, login_name: &str) -> StorageResult<Option<User>> {
        let key = IdentityKind::User.key_for(login_name);
        Ok(self.get_by_key(context, &key).await?.and_then(Identity::into_user))
    }

    /// Gets an agent by login name.
    async fn get_agent(&self, context: &IdentityContext, login_name: &str) -> StorageResult<Option<Agent>> {
        let key = IdentityKind::Agent.key_for(login_name);
        Ok(self.get_by_key(context, &key).await?.and_then(Identity::into_agent))
    }

    /// Gets a role by name.
    async fn get_role(&self, context: &IdentityContext, name: &str) -> StorageResult<Option<Role>> {
        let key = IdentityKind::Role.key_for(name);
        Ok(self.get_by_key(context, &key).await?.and_then(Identity::into_role))
    }

    /// Gets a group by its name (last path segment).
    ///
    /// When several groups share the name the store's own addressing decides
    /// which one is returned. The result must have its parent chain populated.
    async fn get_group(&self, context: &IdentityContext, name: &str) -> StorageResult<Option<Group>>;

    /// Gets a group by path (e.g., "/parent/child/grandchild").
    async fn get_group_by_path(&self, context: &IdentityContext, path: &str) -> StorageResult<Option<Group>> {
        let key = GroupPath::parse(path).to_key();
        Ok(self.get_by_key(context, &key).await?.and_then(Identity::into_group))
    }

    /// Lists the direct children of the group with `parent_key`.
    async fn get_child_groups(&self, context: &IdentityContext, parent_key: &str) -> StorageResult<Vec<Group>>;

    // === Relationships ===

    /// Stores a relationship.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Duplicate` if a relationship with the same id exists.
    async fn add_relationship(&self, context: &IdentityContext, relationship: &Relationship) -> StorageResult<()>;

    /// Removes a relationship by id.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the relationship doesn't exist.
    async fn remove_relationship(&self, context: &IdentityContext, id: Uuid) -> StorageResult<()>;

    /// Lists relationships matching `query`.
    async fn get_relationships(
        &self,
        context: &IdentityContext,
        query: &RelationshipQuery,
    ) -> StorageResult<Vec<Relationship>>;
}
