//! Role domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attribute::Attributes;
use crate::error::{ModelResult, check_not_empty};
use crate::identity::{IdentityKind, IdentityType};

/// A role.
///
/// Roles are granted to users, agents or groups through `Grant`
/// relationships, or to group members through `GroupRole` relationships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Unique identifier.
    pub id: Uuid,
    /// Role name.
    pub name: String,
    /// Role description.
    pub description: Option<String>,
    /// Whether the role is enabled.
    pub enabled: bool,
    /// When the role was created.
    pub created_at: DateTime<Utc>,
    /// Custom attributes.
    pub attributes: Attributes,
}

impl Role {
    /// Creates a new role.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            description: None,
            enabled: true,
            created_at: Utc::now(),
            attributes: Attributes::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }
}

impl IdentityType for Role {
    fn kind(&self) -> IdentityKind {
        IdentityKind::Role
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self) -> String {
        IdentityKind::Role.key_for(&self.name)
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    fn validate(&self) -> ModelResult<()> {
        check_not_empty("role name", &self.name)
    }
}
