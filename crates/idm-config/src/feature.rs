//! Feature sets: which identity kinds, relationship kinds and optional
//! capabilities a store claims to support.
//!
//! Every entry is tri-state. An entry that was never declared reads as
//! unsupported but does not conflict with anything; only two explicit,
//! opposite claims conflict.

use std::collections::BTreeMap;
use std::fmt;

use idm_model::{IdentityKind, RelationshipKind};

use crate::error::{ConfigError, ConfigResult};

/// A single negotiable capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Support for an identity kind.
    Identity(IdentityKind),
    /// Support for a relationship kind.
    Relationship(RelationshipKind),
    /// Support for application-defined relationships.
    CustomRelationships,
    /// Support for partitioning data by realm.
    MultiRealm,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity(kind) => write!(f, "identity:{kind}"),
            Self::Relationship(kind) => write!(f, "relationship:{kind}"),
            Self::CustomRelationships => f.write_str("custom-relationships"),
            Self::MultiRealm => f.write_str("multi-realm"),
        }
    }
}

/// Capabilities declared by one store, or merged across stores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSet {
    identities: BTreeMap<IdentityKind, bool>,
    relationships: BTreeMap<RelationshipKind, bool>,
    custom_relationships: Option<bool>,
    multi_realm: Option<bool>,
}

impl FeatureSet {
    /// Creates a feature set with nothing declared.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a feature set with the standard baseline: every core identity
    /// kind and every standard relationship kind.
    #[must_use]
    pub fn standard() -> Self {
        let mut set = Self::new();
        set.add_feature_support().add_relationship_support();
        set
    }

    /// Marks every core identity kind supported.
    ///
    /// Idempotent and additive.
    pub fn add_feature_support(&mut self) -> &mut Self {
        for kind in IdentityKind::ALL {
            self.identities.insert(kind, true);
        }
        self
    }

    /// Marks every standard relationship kind supported.
    ///
    /// Idempotent and additive.
    pub fn add_relationship_support(&mut self) -> &mut Self {
        for kind in RelationshipKind::standard() {
            self.relationships.insert(kind, true);
        }
        self
    }

    /// Explicitly declares support for one identity kind.
    pub fn set_identity_support(&mut self, kind: IdentityKind, supported: bool) -> &mut Self {
        self.identities.insert(kind, supported);
        self
    }

    /// Explicitly declares support for one relationship kind.
    ///
    /// Custom kinds all share one capability, so declaring any of them sets
    /// the custom-relationships flag.
    pub fn set_relationship_support(&mut self, kind: RelationshipKind, supported: bool) -> &mut Self {
        if kind.is_standard() {
            self.relationships.insert(kind, supported);
        } else {
            self.custom_relationships = Some(supported);
        }
        self
    }

    /// Explicitly declares support for custom relationships.
    pub fn set_supports_custom_relationships(&mut self, supported: bool) -> &mut Self {
        self.custom_relationships = Some(supported);
        self
    }

    /// Explicitly declares support for multiple realms.
    pub fn set_supports_multi_realm(&mut self, supported: bool) -> &mut Self {
        self.multi_realm = Some(supported);
        self
    }

    /// Whether `kind` is supported.
    #[must_use]
    pub fn supports_identity(&self, kind: IdentityKind) -> bool {
        self.identities.get(&kind).copied().unwrap_or(false)
    }

    /// Whether `kind` is supported.
    ///
    /// A custom kind is supported iff custom relationships are enabled.
    #[must_use]
    pub fn supports_relationship(&self, kind: &RelationshipKind) -> bool {
        if kind.is_standard() {
            self.relationships.get(kind).copied().unwrap_or(false)
        } else {
            self.supports_custom_relationships()
        }
    }

    /// Whether custom relationships are supported. Defaults to false.
    #[must_use]
    pub fn supports_custom_relationships(&self) -> bool {
        self.custom_relationships.unwrap_or(false)
    }

    /// Whether multiple realms are supported. Defaults to false.
    #[must_use]
    pub fn supports_multi_realm(&self) -> bool {
        self.multi_realm.unwrap_or(false)
    }

    /// Explicit declaration for a capability, `None` when never declared.
    #[must_use]
    pub fn declared(&self, capability: &Capability) -> Option<bool> {
        match capability {
            Capability::Identity(kind) => self.identities.get(kind).copied(),
            Capability::Relationship(kind) if !kind.is_standard() => self.custom_relationships,
            Capability::Relationship(kind) => self.relationships.get(kind).copied(),
            Capability::CustomRelationships => self.custom_relationships,
            Capability::MultiRealm => self.multi_realm,
        }
    }

    /// Iterates over every explicitly declared capability.
    pub fn declarations(&self) -> impl Iterator<Item = (Capability, bool)> + '_ {
        let identities = self
            .identities
            .iter()
            .map(|(k, v)| (Capability::Identity(*k), *v));
        let relationships = self
            .relationships
            .iter()
            .map(|(k, v)| (Capability::Relationship(k.clone()), *v));
        let flags = [
            (Capability::CustomRelationships, self.custom_relationships),
            (Capability::MultiRealm, self.multi_realm),
        ]
        .into_iter()
        .filter_map(|(c, v)| v.map(|v| (c, v)));

        identities.chain(relationships).chain(flags)
    }

    /// Identity kinds currently supported.
    pub fn supported_identities(&self) -> impl Iterator<Item = IdentityKind> + '_ {
        self.identities.iter().filter(|(_, v)| **v).map(|(k, _)| *k)
    }

    /// Finds the first capability `self` and `other` declare oppositely.
    #[must_use]
    pub fn conflict_with(&self, other: &Self) -> Option<Capability> {
        self.declarations()
            .find(|(capability, value)| other.declared(capability).is_some_and(|o| o != *value))
            .map(|(capability, _)| capability)
    }

    /// Merges two feature sets into their union of explicit claims.
    ///
    /// The merge is associative. It never silently downgrades: opposite
    /// explicit claims are an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FeatureConflict`] on opposite explicit claims.
    pub fn merge(&self, other: &Self) -> ConfigResult<Self> {
        self.merge_named("first feature set", other, "second feature set")
    }

    /// Like [`FeatureSet::merge`], naming both sides in the error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FeatureConflict`] on opposite explicit claims.
    pub fn merge_named(&self, name: &str, other: &Self, other_name: &str) -> ConfigResult<Self> {
        if let Some(capability) = self.conflict_with(other) {
            return Err(ConfigError::FeatureConflict {
                capability: capability.to_string(),
                first: name.to_string(),
                second: other_name.to_string(),
            });
        }

        let mut merged = self.clone();
        merged
            .identities
            .extend(other.identities.iter().map(|(k, v)| (*k, *v)));
        merged
            .relationships
            .extend(other.relationships.iter().map(|(k, v)| (k.clone(), *v)));
        merged.custom_relationships = self.custom_relationships.or(other.custom_relationships);
        merged.multi_realm = self.multi_realm.or(other.multi_realm);
        Ok(merged)
    }
}
