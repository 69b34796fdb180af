//! Group domain model.
//!
//! Groups organize identities and can be nested. A group carries a snapshot
//! of its parent chain; its key is a pure function of that chain:
//! `GROUP:///<ancestor1>/.../<ancestorN>/<name>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attribute::Attributes;
use crate::error::{ModelError, ModelResult, check_path_segment};
use crate::identity::{IdentityKind, IdentityType, parse_key};

/// A group.
///
/// The parent is a back-reference: a copy of the parent as it was resolved,
/// not ownership of the parent's lifetime. Stores persist only the parent's
/// key and rebuild the chain on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    // === Identity ===
    /// Unique identifier.
    pub id: Uuid,
    /// Group name (last path segment).
    pub name: String,

    // === Hierarchy ===
    /// Parent group, `None` for top-level groups.
    parent: Option<Box<Group>>,

    // === Status ===
    /// Whether the group is enabled.
    pub enabled: bool,
    /// When the group was created.
    pub created_at: DateTime<Utc>,

    // === Custom Attributes ===
    /// Custom group attributes.
    pub attributes: Attributes,
}

impl Group {
    /// Creates a new top-level group.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            parent: None,
            enabled: true,
            created_at: Utc::now(),
            attributes: Attributes::new(),
        }
    }

    /// Creates a new child group under `parent`.
    #[must_use]
    pub fn new_child(name: impl Into<String>, parent: &Self) -> Self {
        let mut group = Self::new(name);
        group.parent = Some(Box::new(parent.clone()));
        group
    }

    /// Returns the parent group.
    #[must_use]
    pub fn parent(&self) -> Option<&Self> {
        self.parent.as_deref()
    }

    /// Replaces the parent reference.
    pub fn set_parent(&mut self, parent: Option<Self>) {
        self.parent = parent.map(Box::new);
    }

    /// Checks if this is a top-level group.
    #[must_use]
    pub const fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }

    /// Iterates over the ancestors, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = &Self> {
        std::iter::successors(self.parent(), |g| g.parent())
    }

    /// Returns the path segments from the root to this group.
    #[must_use]
    pub fn path(&self) -> GroupPath {
        let mut segments: Vec<String> = self.ancestors().map(|g| g.name.clone()).collect();
        segments.reverse();
        segments.push(self.name.clone());
        GroupPath { segments }
    }

    /// Number of groups in the chain, this one included.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.ancestors().count() + 1
    }

    /// Key of the parent group, if any.
    #[must_use]
    pub fn parent_key(&self) -> Option<String> {
        self.parent().map(IdentityType::key)
    }

    /// Sets an attribute value.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<crate::AttributeValue>) {
        self.attributes.set(name, value);
    }
}

impl IdentityType for Group {
    fn kind(&self) -> IdentityKind {
        IdentityKind::Group
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self) -> String {
        IdentityKind::Group.key_for(&self.path().to_path_string())
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
        check_path_segment("group name", &self.name)?;
        for ancestor in self.ancestors() {
            check_path_segment("group name", &ancestor.name)?;
        }
        Ok(())
    }
}

/// Helper struct for building group hierarchies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupPath {
    /// Path segments from root to leaf.
    pub segments: Vec<String>,
}

impl GroupPath {
    /// Parses a group path string (e.g., "/parent/child/grandchild").
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let segments: Vec<String> = path
            .trim_start_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        Self { segments }
    }

    /// Parses the path out of a group key.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidKey`] if `key` is not a group key.
    pub fn from_key(key: &str) -> ModelResult<Self> {
        match parse_key(key)? {
            (IdentityKind::Group, path) => Ok(Self::parse(path)),
            _ => Err(ModelError::InvalidKey(key.to_string())),
        }
    }

    /// Returns the path as a string.
    #[must_use]
    pub fn to_path_string(&self) -> String {
        if self.segments.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", self.segments.join("/"))
        }
    }

    /// Returns the group key addressed by this path.
    #[must_use]
    pub fn to_key(&self) -> String {
        IdentityKind::Group.key_for(&self.to_path_string())
    }

    /// Returns the parent path.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() <= 1 {
            None
        } else {
            Some(Self {
                segments: self.segments[..self.segments.len() - 1].to_vec(),
            })
        }
    }

    /// Returns the leaf (last segment).
    #[must_use]
    pub fn leaf(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Returns the depth (number of segments).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}
