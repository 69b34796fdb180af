//! Audit events for identity operations.
//!
//! The securing decorator emits one [`Event`] per facade call, whatever the
//! outcome, so that auditing observes successes, dispatch failures, backend
//! failures and policy denials alike.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    // Identity events
    /// Identity created.
    IdentityCreated,
    /// Identity read.
    IdentityRead,
    /// Identity updated.
    IdentityUpdated,
    /// Identity removed.
    IdentityRemoved,

    // Relationship events
    /// Relationship added.
    RelationshipAdded,
    /// Relationship removed.
    RelationshipRemoved,
    /// Relationships queried.
    RelationshipQueried,

    // Runtime events
    /// Configuration resolved, before it is frozen.
    ConfigurationResolved,
}

/// Outcome of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOutcome {
    /// Operation succeeded.
    Success,
    /// Operation failed.
    Failure,
    /// Operation was rejected before reaching a store.
    Denied,
}

/// An audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: Uuid,

    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Type of event.
    pub event_type: EventType,

    /// Outcome of the event.
    pub outcome: EventOutcome,

    /// Name of the facade operation (e.g. `create_group`).
    pub operation: Option<String>,

    /// Realm addressed by the caller's scope.
    pub realm: Option<String>,

    /// Key of the identity or relationship involved.
    pub subject: Option<String>,

    /// Error message (for failure and denied events).
    pub error: Option<String>,

    /// Additional details as key-value pairs.
    pub details: Vec<(String, String)>,
}

impl Event {
    /// Creates a new event builder.
    #[must_use]
    pub const fn builder(event_type: EventType) -> EventBuilder {
        EventBuilder::new(event_type)
    }

    /// Returns the value of a detail, if present.
    #[must_use]
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Builder for creating events.
pub struct EventBuilder {
    event_type: EventType,
    outcome: EventOutcome,
    operation: Option<String>,
    realm: Option<String>,
    subject: Option<String>,
    error: Option<String>,
    details: Vec<(String, String)>,
}

impl EventBuilder {
    /// Creates a new event builder.
    #[must_use]
    pub const fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            outcome: EventOutcome::Success,
            operation: None,
            realm: None,
            subject: None,
            error: None,
            details: Vec::new(),
        }
    }

    /// Sets the outcome to success.
    #[must_use]
    pub const fn success(mut self) -> Self {
        self.outcome = EventOutcome::Success;
        self
    }

    /// Sets the outcome to failure with an error message.
    #[must_use]
    pub fn failure(mut self, error: impl Into<String>) -> Self {
        self.outcome = EventOutcome::Failure;
        self.error = Some(error.into());
        self
    }

    /// Sets the outcome to denied with a reason.
    #[must_use]
    pub fn denied(mut self, reason: impl Into<String>) -> Self {
        self.outcome = EventOutcome::Denied;
        self.error = Some(reason.into());
        self
    }

    /// Sets the operation name.
    #[must_use]
    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Sets the realm.
    #[must_use]
    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    /// Sets the subject key.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Adds a detail key-value pair.
    #[must_use]
    pub fn detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push((key.into(), value.into()));
        self
    }

    /// Builds the event.
    #[must_use]
    pub fn build(self) -> Event {
        Event {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            event_type: self.event_type,
            outcome: self.outcome,
            operation: self.operation,
            realm: self.realm,
            subject: self.subject,
            error: self.error,
            details: self.details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_builder_creates_success_event() {
        let event = Event::builder(EventType::IdentityCreated)
            .success()
            .operation("create_group")
            .realm("default")
            .subject("GROUP:///admins")
            .build();

        assert_eq!(event.event_type, EventType::IdentityCreated);
        assert_eq!(event.outcome, EventOutcome::Success);
        assert_eq!(event.operation.as_deref(), Some("create_group"));
        assert_eq!(event.subject.as_deref(), Some("GROUP:///admins"));
        assert!(event.error.is_none());
    }

    #[test]
    fn event_builder_creates_denied_event() {
        let event = Event::builder(EventType::IdentityRemoved)
            .denied("read-only scope")
            .detail("store", "file")
            .build();

        assert_eq!(event.outcome, EventOutcome::Denied);
        assert_eq!(event.error.as_deref(), Some("read-only scope"));
        assert_eq!(event.detail("store"), Some("file"));
        assert_eq!(event.detail("missing"), None);
    }

    #[test]
    fn event_has_timestamp() {
        let before = Utc::now();
        let event = Event::builder(EventType::ConfigurationResolved).build();
        let after = Utc::now();

        assert!(event.timestamp >= before);
        assert!(event.timestamp <= after);
    }
}
