//! Relationships between identities.
//!
//! A relationship binds identities under named descriptors, e.g. a `Grant`
//! binds an `assignee` to a `role`. Relationships reference identities by
//! key so that participants may live in different stores.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attribute::Attributes;
use crate::group::Group;
use crate::identity::IdentityType;
use crate::role::Role;

/// Descriptor of the identity receiving a role.
pub const ASSIGNEE: &str = "assignee";
/// Descriptor of the role in a grant.
pub const ROLE: &str = "role";
/// Descriptor of the member in a group membership.
pub const MEMBER: &str = "member";
/// Descriptor of the group in a membership or group role.
pub const GROUP: &str = "group";

/// Relationship kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// A role granted to an identity.
    Grant,
    /// An identity that is a member of a group.
    GroupMembership,
    /// A role held by a member within a group.
    GroupRole,
    /// An application-defined relationship.
    Custom(String),
}

impl RelationshipKind {
    /// The standard relationship kinds every conforming store offers.
    #[must_use]
    pub fn standard() -> [Self; 3] {
        [Self::Grant, Self::GroupMembership, Self::GroupRole]
    }

    /// Whether this is one of the standard kinds.
    #[must_use]
    pub const fn is_standard(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }

    /// Name used in logs and error messages.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Grant => "Grant",
            Self::GroupMembership => "GroupMembership",
            Self::GroupRole => "GroupRole",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A relationship between identities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Unique identifier.
    pub id: Uuid,
    /// Kind of relationship.
    pub kind: RelationshipKind,
    /// Participants: descriptor to identity key.
    identities: BTreeMap<String, String>,
    /// Custom attributes.
    pub attributes: Attributes,
    /// When the relationship was created.
    pub created_at: DateTime<Utc>,
}

impl Relationship {
    /// Creates an empty relationship of the given kind.
    #[must_use]
    pub fn new(kind: RelationshipKind) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind,
            identities: BTreeMap::new(),
            attributes: Attributes::new(),
            created_at: Utc::now(),
        }
    }

    /// Grants `role` to `assignee`.
    #[must_use]
    pub fn grant(assignee: &(impl IdentityType + ?Sized), role: &Role) -> Self {
        Self::new(RelationshipKind::Grant)
            .with_identity(ASSIGNEE, assignee)
            .with_identity(ROLE, role)
    }

    /// Makes `member` a member of `group`.
    #[must_use]
    pub fn group_membership(member: &(impl IdentityType + ?Sized), group: &Group) -> Self {
        Self::new(RelationshipKind::GroupMembership)
            .with_identity(MEMBER, member)
            .with_identity(GROUP, group)
    }

    /// Grants `role` to `assignee` within `group`.
    #[must_use]
    pub fn group_role(
        assignee: &(impl IdentityType + ?Sized),
        group: &Group,
        role: &Role,
    ) -> Self {
        Self::new(RelationshipKind::GroupRole)
            .with_identity(ASSIGNEE, assignee)
            .with_identity(GROUP, group)
            .with_identity(ROLE, role)
    }

    /// Creates an application-defined relationship.
    #[must_use]
    pub fn custom(name: impl Into<String>) -> Self {
        Self::new(RelationshipKind::Custom(name.into()))
    }

    /// Binds an identity under a descriptor.
    #[must_use]
    pub fn with_identity(
        mut self,
        descriptor: impl Into<String>,
        identity: &(impl IdentityType + ?Sized),
    ) -> Self {
        self.identities.insert(descriptor.into(), identity.key());
        self
    }

    /// Binds an identity key under a descriptor.
    #[must_use]
    pub fn with_identity_key(mut self, descriptor: impl Into<String>, key: impl Into<String>) -> Self {
        self.identities.insert(descriptor.into(), key.into());
        self
    }

    /// Key of the identity bound under `descriptor`.
    #[must_use]
    pub fn identity(&self, descriptor: &str) -> Option<&str> {
        self.identities.get(descriptor).map(String::as_str)
    }

    /// Iterates over descriptors and identity keys.
    pub fn identities(&self) -> impl Iterator<Item = (&str, &str)> {
        self.identities.iter().map(|(d, k)| (d.as_str(), k.as_str()))
    }

    /// Whether the identity with `key` participates in this relationship.
    #[must_use]
    pub fn involves(&self, key: &str) -> bool {
        self.identities.values().any(|k| k == key)
    }

    /// Derived key of the relationship.
    #[must_use]
    pub fn key(&self) -> String {
        format!("RELATIONSHIP://{}", self.id)
    }
}

/// Filter for relationship lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipQuery {
    /// Restrict to one kind.
    pub kind: Option<RelationshipKind>,
    /// Required participants: descriptor to identity key.
    pub identities: BTreeMap<String, String>,
    /// Identity keys that must participate under any descriptor.
    pub involving: Vec<String>,
}

impl RelationshipQuery {
    /// Creates an empty query matching every relationship.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for one kind.
    #[must_use]
    pub fn of_kind(kind: RelationshipKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Requires `key` under `descriptor`.
    #[must_use]
    pub fn with_identity(mut self, descriptor: impl Into<String>, key: impl Into<String>) -> Self {
        self.identities.insert(descriptor.into(), key.into());
        self
    }

    /// Requires `key` under any descriptor.
    #[must_use]
    pub fn involving(mut self, key: impl Into<String>) -> Self {
        self.involving.push(key.into());
        self
    }

    /// Checks whether a relationship satisfies the query.
    #[must_use]
    pub fn matches(&self, relationship: &Relationship) -> bool {
        if self.kind.as_ref().is_some_and(|k| *k != relationship.kind) {
            return false;
        }
        let bound = self
            .identities
            .iter()
            .all(|(d, k)| relationship.identity(d) == Some(k.as_str()));
        bound && self.involving.iter().all(|k| relationship.involves(k))
    }
}
