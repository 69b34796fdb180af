//! The shared identity capability and key derivation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::Agent;
use crate::attribute::Attributes;
use crate::error::{ModelError, ModelResult};
use crate::group::Group;
use crate::role::Role;
use crate::user::User;

/// Separator between a key's kind prefix and its identifier.
pub const KEY_SEPARATOR: &str = "://";

/// Identity entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityKind {
    /// A human user.
    User,
    /// A group of identities, possibly nested.
    Group,
    /// A role that can be granted.
    Role,
    /// A non-human agent (service, device).
    Agent,
}

impl IdentityKind {
    /// Every identity kind. All of them are core kinds a conforming store offers.
    pub const ALL: [Self; 4] = [Self::User, Self::Group, Self::Role, Self::Agent];

    /// Prefix used in keys of this kind.
    #[must_use]
    pub const fn key_prefix(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Group => "GROUP",
            Self::Role => "ROLE",
            Self::Agent => "AGENT",
        }
    }

    /// Builds a key of this kind from an identifier.
    #[must_use]
    pub fn key_for(self, identifier: &str) -> String {
        format!("{}{KEY_SEPARATOR}{identifier}", self.key_prefix())
    }

    /// Lowercase name used in logs and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
            Self::Role => "role",
            Self::Agent => "agent",
        }
    }
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Splits a key into its kind and identifier.
///
/// For groups the identifier is the full path, e.g. `/parent/child`.
///
/// # Errors
///
/// Returns [`ModelError::InvalidKey`] if the prefix is unknown or the
/// identifier is empty.
pub fn parse_key(key: &str) -> ModelResult<(IdentityKind, &str)> {
    let (prefix, identifier) = key
        .split_once(KEY_SEPARATOR)
        .ok_or_else(|| ModelError::InvalidKey(key.to_string()))?;

    let kind = IdentityKind::ALL
        .into_iter()
        .find(|k| k.key_prefix() == prefix)
        .ok_or_else(|| ModelError::InvalidKey(key.to_string()))?;

    if identifier.is_empty() || (kind == IdentityKind::Group && identifier == "/") {
        return Err(ModelError::InvalidKey(key.to_string()));
    }

    Ok((kind, identifier))
}

/// Capability shared by users, groups, roles and agents.
pub trait IdentityType {
    /// Kind of this identity.
    fn kind(&self) -> IdentityKind;

    /// Surrogate identifier assigned at construction.
    fn id(&self) -> Uuid;

    /// Derived key. Recomputed on every call from identifying fields.
    fn key(&self) -> String;

    /// Whether the identity is enabled.
    fn is_enabled(&self) -> bool;

    /// When the identity was created.
    fn created_at(&self) -> DateTime<Utc>;

    /// Attributes of the identity.
    fn attributes(&self) -> &Attributes;

    /// Mutable attributes of the identity.
    fn attributes_mut(&mut self) -> &mut Attributes;

    /// Checks that the identifying fields can produce a valid key.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] describing the first invalid field.
    fn validate(&self) -> ModelResult<()>;
}

/// Any identity entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Identity {
    /// A user.
    User(User),
    /// A group.
    Group(Group),
    /// A role.
    Role(Role),
    /// An agent.
    Agent(Agent),
}

impl Identity {
    fn inner(&self) -> &dyn IdentityType {
        match self {
            Self::User(u) => u,
            Self::Group(g) => g,
            Self::Role(r) => r,
            Self::Agent(a) => a,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn IdentityType {
        match self {
            Self::User(u) => u,
            Self::Group(g) => g,
            Self::Role(r) => r,
            Self::Agent(a) => a,
        }
    }

    /// Returns the user, if this is one.
    #[must_use]
    pub fn into_user(self) -> Option<User> {
        match self {
            Self::User(u) => Some(u),
            _ => None,
        }
    }

    /// Returns the group, if this is one.
    #[must_use]
    pub fn into_group(self) -> Option<Group> {
        match self {
            Self::Group(g) => Some(g),
            _ => None,
        }
    }

    /// Returns the role, if this is one.
    #[must_use]
    pub fn into_role(self) -> Option<Role> {
        match self {
            Self::Role(r) => Some(r),
            _ => None,
        }
    }

    /// Returns the agent, if this is one.
    #[must_use]
    pub fn into_agent(self) -> Option<Agent> {
        match self {
            Self::Agent(a) => Some(a),
            _ => None,
        }
    }

    /// Borrows the group, if this is one.
    #[must_use]
    pub const fn as_group(&self) -> Option<&Group> {
        match self {
            Self::Group(g) => Some(g),
            _ => None,
        }
    }
}

impl IdentityType for Identity {
    fn kind(&self) -> IdentityKind {
        self.inner().kind()
    }

    fn id(&self) -> Uuid {
        self.inner().id()
    }

    fn key(&self) -> String {
        self.inner().key()
    }

    fn is_enabled(&self) -> bool {
        self.inner().is_enabled()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.inner().created_at()
    }

    fn attributes(&self) -> &Attributes {
        self.inner().attributes()
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        self.inner_mut().attributes_mut()
    }

    fn validate(&self) -> ModelResult<()> {
        self.inner().validate()
    }
}

impl From<User> for Identity {
    fn from(value: User) -> Self {
        Self::User(value)
    }
}

impl From<Group> for Identity {
    fn from(value: Group) -> Self {
        Self::Group(value)
    }
}

impl From<Role> for Identity {
    fn from(value: Role) -> Self {
        Self::Role(value)
    }
}

impl From<Agent> for Identity {
    fn from(value: Agent) -> Self {
        Self::Agent(value)
    }
}
