//! Agent domain model.
//!
//! Agents are non-human identities such as services or scheduled jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attribute::Attributes;
use crate::error::{ModelResult, check_not_empty};
use crate::identity::{IdentityKind, IdentityType};

/// A non-human identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique identifier.
    pub id: Uuid,
    /// Login name.
    pub login_name: String,
    /// Whether the agent is enabled.
    pub enabled: bool,
    /// When the agent was created.
    pub created_at: DateTime<Utc>,
    /// Custom attributes.
    pub attributes: Attributes,
}

impl Agent {
    /// Creates a new enabled agent.
    #[must_use]
    pub fn new(login_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            login_name: login_name.into(),
            enabled: true,
            created_at: Utc::now(),
            attributes: Attributes::new(),
        }
    }
}

impl IdentityType for Agent {
    fn kind(&self) -> IdentityKind {
        IdentityKind::Agent
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self) -> String {
        IdentityKind::Agent.key_for(&self.login_name)
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
        check_not_empty("login name", &self.login_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_key() {
        let agent = Agent::new("backup-job");
        assert_eq!(agent.key(), "AGENT://backup-job");
        assert_eq!(agent.kind(), IdentityKind::Agent);
    }
}
