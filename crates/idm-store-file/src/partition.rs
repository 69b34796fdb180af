//! Per-realm data and its on-disk snapshot format.

use std::collections::BTreeMap;

use idm_model::{Group, Identity, IdentityType, Relationship, RelationshipQuery};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored identity. Groups are kept without their parent; only the
/// parent's key is recorded and the chain is rebuilt on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Record {
    pub key: String,
    pub parent_key: Option<String>,
    pub identity: Identity,
}

impl Record {
    pub fn new(identity: &Identity) -> Self {
        let key = identity.key();
        match identity {
            Identity::Group(group) => {
                let parent_key = group.parent_key();
                let mut detached = group.clone();
                detached.set_parent(None);
                Self {
                    key,
                    parent_key,
                    identity: Identity::Group(detached),
                }
            }
            other => Self {
                key,
                parent_key: None,
                identity: other.clone(),
            },
        }
    }
}

/// Everything one realm holds.
#[derive(Debug, Default)]
pub(crate) struct Partition {
    pub identities: BTreeMap<String, Record>,
    pub relationships: BTreeMap<Uuid, Relationship>,
}

impl Partition {
    /// Returns the identity at `key`, groups with their parent chain.
    pub fn resolve(&self, key: &str) -> Option<Identity> {
        let record = self.identities.get(key)?;
        match &record.identity {
            Identity::Group(_) => self.resolve_group(key).map(Identity::Group),
            other => Some(other.clone()),
        }
    }

    pub fn resolve_group(&self, key: &str) -> Option<Group> {
        let record = self.identities.get(key)?;
        let mut group = record.identity.as_group()?.clone();
        if let Some(parent_key) = &record.parent_key {
            group.set_parent(self.resolve_group(parent_key));
        }
        Some(group)
    }

    /// Groups whose name is `name`, shallowest first, then by key.
    pub fn groups_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        let mut matches: Vec<&Record> = self
            .identities
            .values()
            .filter(|r| r.identity.as_group().is_some_and(|g| g.name == name))
            .collect();
        matches.sort_by_key(|r| r.key.matches('/').count());
        matches.into_iter()
    }

    pub fn children_of(&self, parent_key: &str) -> Vec<Group> {
        self.identities
            .values()
            .filter(|r| r.parent_key.as_deref() == Some(parent_key))
            .filter_map(|r| self.resolve_group(&r.key))
            .collect()
    }

    /// Drops every relationship referencing `key` and returns them.
    pub fn forget_relationships_of(&mut self, key: &str) -> Vec<Relationship> {
        let ids: Vec<Uuid> = self
            .relationships
            .values()
            .filter(|r| r.involves(key))
            .map(|r| r.id)
            .collect();
        ids.iter()
            .filter_map(|id| self.relationships.remove(id))
            .collect()
    }

    pub fn query(&self, query: &RelationshipQuery) -> Vec<Relationship> {
        self.relationships
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            identities: self.identities.values().cloned().collect(),
            relationships: self.relationships.values().cloned().collect(),
        }
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            identities: snapshot
                .identities
                .into_iter()
                .map(|r| (r.key.clone(), r))
                .collect(),
            relationships: snapshot
                .relationships
                .into_iter()
                .map(|r| (r.id, r))
                .collect(),
        }
    }
}

/// Reverts one applied change when it could not be written to disk.
#[derive(Debug)]
pub(crate) enum Undo {
    /// Drop a newly inserted identity.
    Inserted(String),
    /// Put back the record an update replaced.
    Replaced(Record),
    /// Put back a removed identity and the relationships dropped with it.
    Removed(Record, Vec<Relationship>),
    /// Drop a newly added relationship.
    Related(Uuid),
    /// Put back a removed relationship.
    Unrelated(Relationship),
}

impl Undo {
    pub fn revert(self, partition: &mut Partition) {
        match self {
            Self::Inserted(key) => {
                partition.identities.remove(&key);
            }
            Self::Replaced(record) => {
                partition.identities.insert(record.key.clone(), record);
            }
            Self::Removed(record, relationships) => {
                partition.identities.insert(record.key.clone(), record);
                partition
                    .relationships
                    .extend(relationships.into_iter().map(|r| (r.id, r)));
            }
            Self::Related(id) => {
                partition.relationships.remove(&id);
            }
            Self::Unrelated(relationship) => {
                partition.relationships.insert(relationship.id, relationship);
            }
        }
    }
}

/// Serialized form of a partition.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    pub identities: Vec<Record>,
    pub relationships: Vec<Relationship>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(partition: &mut Partition, identity: Identity) {
        let record = Record::new(&identity);
        partition.identities.insert(record.key.clone(), record);
    }

    #[test]
    fn reverting_a_removal_restores_relationships() {
        let user = idm_model::User::new("frank");
        let group = Group::new("devs");
        let mut partition = Partition::default();
        insert(&mut partition, Identity::User(user.clone()));
        insert(&mut partition, Identity::Group(group.clone()));
        let membership = Relationship::group_membership(&user, &group);
        partition.relationships.insert(membership.id, membership.clone());

        let record = partition.identities.remove(&user.key()).unwrap();
        let dropped = partition.forget_relationships_of(&user.key());
        assert_eq!(dropped.len(), 1);
        assert!(partition.relationships.is_empty());

        Undo::Removed(record, dropped).revert(&mut partition);
        assert!(partition.resolve(&user.key()).is_some());
        assert_eq!(partition.relationships.get(&membership.id), Some(&membership));
    }

    #[test]
    fn groups_are_stored_detached_and_resolved_with_chain() {
        let root = Group::new("root");
        let mid = Group::new_child("mid", &root);
        let leaf = Group::new_child("leaf", &mid);

        let mut partition = Partition::default();
        insert(&mut partition, Identity::Group(root));
        insert(&mut partition, Identity::Group(mid));
        insert(&mut partition, Identity::Group(leaf.clone()));

        let stored = &partition.identities[&leaf.key()];
        assert_eq!(stored.parent_key.as_deref(), Some("GROUP:///root/mid"));
        assert!(stored.identity.as_group().unwrap().parent().is_none());

        let resolved = partition.resolve_group(&leaf.key()).unwrap();
        assert_eq!(resolved.key(), "GROUP:///root/mid/leaf");
        assert_eq!(resolved.depth(), 3);
    }

    #[test]
    fn shallowest_group_wins_by_name() {
        let a = Group::new("a");
        let nested = Group::new_child("shared", &a);
        let top = Group::new("shared");

        let mut partition = Partition::default();
        insert(&mut partition, Identity::Group(a));
        insert(&mut partition, Identity::Group(nested));
        insert(&mut partition, Identity::Group(top));

        let first = partition.groups_named("shared").next().unwrap();
        assert_eq!(first.key, "GROUP:///shared");
    }
}
