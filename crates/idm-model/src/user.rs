//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attribute::Attributes;
use crate::error::{ModelResult, check_not_empty};
use crate::identity::{IdentityKind, IdentityType};

/// A human user.
///
/// Users are addressed by their login name, which is also the identifying
/// field of their key (`USER://<login_name>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    // === Identity ===
    /// Unique identifier.
    pub id: Uuid,
    /// Login name (unique per store and realm).
    pub login_name: String,

    // === Profile ===
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
    /// Email address.
    pub email: Option<String>,

    // === Status ===
    /// Whether the user is enabled.
    pub enabled: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the account expires, if ever.
    pub expires_at: Option<DateTime<Utc>>,

    // === Custom Attributes ===
    /// Custom user attributes.
    pub attributes: Attributes,
}

impl User {
    /// Creates a new enabled user.
    #[must_use]
    pub fn new(login_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            login_name: login_name.into(),
            first_name: None,
            last_name: None,
            email: None,
            enabled: true,
            created_at: Utc::now(),
            expires_at: None,
            attributes: Attributes::new(),
        }
    }

    /// Sets the email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets first and last name.
    #[must_use]
    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = Some(first.into());
        self.last_name = Some(last.into());
        self
    }

    /// Gets the display name (first + last or login name).
    #[must_use]
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.login_name.clone(),
        }
    }

    /// Checks whether the account has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

impl IdentityType for User {
    fn kind(&self) -> IdentityKind {
        IdentityKind::User
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self) -> String {
        IdentityKind::User.key_for(&self.login_name)
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
