//! File-backed identity store.

use std::collections::HashMap;

use async_trait::async_trait;
use idm_config::FileSettings;
use idm_model::{Group, Identity, IdentityKind, IdentityType, Relationship, RelationshipQuery};
use idm_spi::IdentityContext;
use idm_storage::{IdentityStore, StorageError, StorageResult};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::partition::{Partition, Record, Undo};
use crate::persist::DataFiles;

/// Identity store keeping realms in memory, optionally mirrored to disk.
///
/// Removing an identity also drops the relationships it takes part in.
/// Group removal does not cascade to child groups.
#[derive(Debug)]
pub struct FileIdentityStore {
    name: String,
    partitions: RwLock<HashMap<String, Partition>>,
    files: Option<DataFiles>,
    // Serializes mutations with their snapshot writes so a failed write can
    // be reverted before another mutation lands.
    write_lock: Mutex<()>,
}

impl FileIdentityStore {
    /// Creates a store that never touches the filesystem.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            name: "file".to_string(),
            partitions: RwLock::new(HashMap::new()),
            files: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Opens a store with `settings`, loading existing data files.
    ///
    /// ## Errors
    ///
    /// Returns an error if the working directory can not be prepared or an
    /// existing data file can not be read.
    pub async fn open(settings: &FileSettings) -> StorageResult<Self> {
        let Some(dir) = &settings.working_dir else {
            return Ok(Self::in_memory());
        };

        let files = DataFiles::open(dir, settings.always_create_files, !settings.async_write).await?;
        let partitions = files.load_all().await?;

        tracing::info!(
            working_dir = %dir.display(),
            realms = partitions.len(),
            "Opened file identity store"
        );

        Ok(Self {
            name: "file".to_string(),
            partitions: RwLock::new(partitions),
            files: Some(files),
            write_lock: Mutex::new(()),
        })
    }

    /// Renames the store for logs.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn read<T>(&self, realm: &str, f: impl FnOnce(&Partition) -> T) -> Option<T> {
        self.partitions.read().get(realm).map(f)
    }

    fn mutate<T>(
        &self,
        realm: &str,
        f: impl FnOnce(&mut Partition) -> StorageResult<(T, Undo)>,
    ) -> StorageResult<(T, Undo)> {
        let mut partitions = self.partitions.write();
        f(partitions.entry(realm.to_string()).or_default())
    }

    /// Applies `f` to the partition of `realm` and writes the result to disk.
    ///
    /// Either both the partition and its data file reflect the change, or
    /// neither does.
    async fn apply<T>(
        &self,
        realm: &str,
        f: impl FnOnce(&mut Partition) -> StorageResult<(T, Undo)>,
    ) -> StorageResult<T> {
        let Some(files) = &self.files else {
            return self.mutate(realm, f).map(|(value, _)| value);
        };

        files.path_for(realm)?;
        let _guard = self.write_lock.lock().await;
        let (value, undo) = self.mutate(realm, f)?;
        let snapshot = self
            .read(realm, Partition::snapshot)
            .unwrap_or_default();

        match files.write(realm, &snapshot).await {
            Ok(()) => Ok(value),
            Err(err) => {
                tracing::warn!(
                    store = %self.name,
                    realm = %realm,
                    error = %err,
                    "Data file write failed, reverting change"
                );
                if let Some(partition) = self.partitions.write().get_mut(realm) {
                    undo.revert(partition);
                }
                Err(err)
            }
        }
    }
}

#[async_trait]
impl IdentityStore for FileIdentityStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create(&self, context: &IdentityContext, identity: &Identity) -> StorageResult<()> {
        let record = Record::new(identity);
        let key = record.key.clone();

        self.apply(context.realm(), |partition| {
            if partition.identities.contains_key(&key) {
                return Err(StorageError::duplicate(identity.kind().as_str(), key.clone()));
            }
            partition.identities.insert(key.clone(), record);
            Ok(((), Undo::Inserted(key.clone())))
        })
        .await?;

        tracing::debug!(store = %self.name, realm = %context.realm(), key = %key, "Identity stored");
        Ok(())
    }

    async fn update(&self, context: &IdentityContext, identity: &Identity) -> StorageResult<()> {
        let record = Record::new(identity);

        self.apply(context.realm(), |partition| {
            match partition.identities.get_mut(&record.key) {
                Some(existing) => {
                    let previous = std::mem::replace(existing, record);
                    Ok(((), Undo::Replaced(previous)))
                }
                None => Err(StorageError::not_found(identity.kind().as_str(), record.key)),
            }
        })
        .await
    }

    async fn remove(&self, context: &IdentityContext, kind: IdentityKind, key: &str) -> StorageResult<()> {
        let dropped = self
            .apply(context.realm(), |partition| {
                let Some(record) = partition.identities.remove(key) else {
                    return Err(StorageError::not_found(kind.as_str(), key));
                };
                let relationships = partition.forget_relationships_of(key);
                Ok((relationships.len(), Undo::Removed(record, relationships)))
            })
            .await?;

        tracing::debug!(
            store = %self.name,
            realm = %context.realm(),
            key = %key,
            relationships = dropped,
            "Identity removed"
        );
        Ok(())
    }

    async fn get_by_key(&self, context: &IdentityContext, key: &str) -> StorageResult<Option<Identity>> {
        Ok(self.read(context.realm(), |p| p.resolve(key)).flatten())
    }

    async fn get_group(&self, context: &IdentityContext, name: &str) -> StorageResult<Option<Group>> {
        Ok(self
            .read(context.realm(), |p| {
                p.groups_named(name)
                    .next()
                    .and_then(|record| p.resolve_group(&record.key))
            })
            .flatten())
    }

    async fn get_child_groups(&self, context: &IdentityContext, parent_key: &str) -> StorageResult<Vec<Group>> {
        Ok(self
            .read(context.realm(), |p| p.children_of(parent_key))
            .unwrap_or_default())
    }

    async fn add_relationship(&self, context: &IdentityContext, relationship: &Relationship) -> StorageResult<()> {
        self.apply(context.realm(), |partition| {
            if partition.relationships.contains_key(&relationship.id) {
                return Err(StorageError::duplicate("relationship", relationship.key()));
            }
            partition
                .relationships
                .insert(relationship.id, relationship.clone());
            Ok(((), Undo::Related(relationship.id)))
        })
        .await
    }

    async fn remove_relationship(&self, context: &IdentityContext, id: Uuid) -> StorageResult<()> {
        self.apply(context.realm(), |partition| {
            partition
                .relationships
                .remove(&id)
                .map(|removed| ((), Undo::Unrelated(removed)))
                .ok_or_else(|| StorageError::not_found("relationship", id.to_string()))
        })
        .await
    }

    async fn get_relationships(
        &self,
        context: &IdentityContext,
        query: &RelationshipQuery,
    ) -> StorageResult<Vec<Relationship>> {
        Ok(self
            .read(context.realm(), |p| p.query(query))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use idm_model::{Role, User};

    use super::*;

    fn context(realm: &str) -> IdentityContext {
        IdentityContext::new(realm, realm == "default", None)
    }

    #[tokio::test]
    async fn group_round_trip_with_parent_chain() {
        let store = FileIdentityStore::in_memory();
        let ctx = context("default");

        let parent = Group::new("parentGroup");
        let child = Group::new_child("childGroup", &parent);
        store.create(&ctx, &Identity::Group(parent)).await.unwrap();
        store.create(&ctx, &Identity::Group(child)).await.unwrap();

        let loaded = store.get_group(&ctx, "childGroup").await.unwrap().unwrap();
        assert_eq!(loaded.key(), "GROUP:///parentGroup/childGroup");
        assert_eq!(loaded.parent().map(|p| p.name.as_str()), Some("parentGroup"));

        let children = store
            .get_child_groups(&ctx, "GROUP:///parentGroup")
            .await
            .unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "childGroup");
    }

    #[tokio::test]
    async fn realms_are_partitioned() {
        let store = FileIdentityStore::in_memory();
        store
            .create(&context("a"), &Identity::User(User::new("alice")))
            .await
            .unwrap();

        assert!(store.get_user(&context("a"), "alice").await.unwrap().is_some());
        assert!(store.get_user(&context("b"), "alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_and_missing_entities() {
        let store = FileIdentityStore::in_memory();
        let ctx = context("default");
        let role = Identity::Role(Role::new("admin"));

        store.create(&ctx, &role).await.unwrap();
        assert!(store.create(&ctx, &role).await.unwrap_err().is_duplicate());

        store.remove(&ctx, IdentityKind::Role, "ROLE://admin").await.unwrap();
        assert!(store
            .remove(&ctx, IdentityKind::Role, "ROLE://admin")
            .await
            .unwrap_err()
            .is_not_found());
        assert!(store.update(&ctx, &role).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn removing_identity_drops_its_relationships() {
        let store = FileIdentityStore::in_memory();
        let ctx = context("default");
        let user = User::new("bob");
        let role = Role::new("auditor");
        store.create(&ctx, &Identity::User(user.clone())).await.unwrap();
        store.create(&ctx, &Identity::Role(role.clone())).await.unwrap();
        store
            .add_relationship(&ctx, &Relationship::grant(&user, &role))
            .await
            .unwrap();

        let involving = RelationshipQuery::new().involving(user.key());
        assert_eq!(store.get_relationships(&ctx, &involving).await.unwrap().len(), 1);

        store.remove(&ctx, IdentityKind::User, &user.key()).await.unwrap();
        assert!(store.get_relationships(&ctx, &involving).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let settings = FileSettings::persistent(dir.path());
        let ctx = context("default");

        {
            let store = FileIdentityStore::open(&settings).await.unwrap();
            let parent = Group::new("ops");
            let child = Group::new_child("oncall", &parent);
            store.create(&ctx, &Identity::Group(parent)).await.unwrap();
            store.create(&ctx, &Identity::Group(child)).await.unwrap();
        }

        let reopened = FileIdentityStore::open(&settings).await.unwrap();
        let group = reopened
            .get_group_by_path(&ctx, "/ops/oncall")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(group.parent().map(|p| p.name.as_str()), Some("ops"));
    }

    #[tokio::test]
    async fn unusable_realm_name_leaves_no_trace() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileIdentityStore::open(&FileSettings::persistent(dir.path()))
            .await
            .unwrap();
        let ctx = context("a/b");
        let user = Identity::User(User::new("zoe"));

        assert!(matches!(
            store.create(&ctx, &user).await,
            Err(StorageError::InvalidData(_))
        ));
        assert!(store.get_user(&ctx, "zoe").await.unwrap().is_none());
        assert!(matches!(
            store.create(&ctx, &user).await,
            Err(StorageError::InvalidData(_))
        ));
    }

    #[tokio::test]
    async fn failed_writes_are_reverted() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileIdentityStore::open(&FileSettings::persistent(dir.path()))
            .await
            .unwrap();
        let ctx = context("default");
        let user = User::new("dave").with_email("dave@example.com");
        let role = Role::new("ops");
        store.create(&ctx, &Identity::User(user.clone())).await.unwrap();
        store.create(&ctx, &Identity::Role(role.clone())).await.unwrap();
        let grant = Relationship::grant(&user, &role);
        store.add_relationship(&ctx, &grant).await.unwrap();

        // Every later write fails once the working directory is gone.
        std::fs::remove_dir_all(dir.path()).unwrap();

        let newcomer = Identity::User(User::new("erin"));
        assert!(store.create(&ctx, &newcomer).await.is_err());
        assert!(store.get_user(&ctx, "erin").await.unwrap().is_none());

        let changed = user.clone().with_email("other@example.com");
        assert!(store.update(&ctx, &Identity::User(changed)).await.is_err());
        let loaded = store.get_user(&ctx, "dave").await.unwrap().unwrap();
        assert_eq!(loaded.email.as_deref(), Some("dave@example.com"));

        assert!(store.remove(&ctx, IdentityKind::User, &user.key()).await.is_err());
        assert!(store.get_user(&ctx, "dave").await.unwrap().is_some());
        let involving = RelationshipQuery::new().involving(user.key());
        assert_eq!(store.get_relationships(&ctx, &involving).await.unwrap().len(), 1);

        assert!(store.remove_relationship(&ctx, grant.id).await.is_err());
        let extra = Relationship::grant(&user, &role);
        assert!(store.add_relationship(&ctx, &extra).await.is_err());
        let grants = store.get_relationships(&ctx, &involving).await.unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].id, grant.id);
    }

    #[tokio::test]
    async fn always_create_files_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context("default");
        let store = FileIdentityStore::open(&FileSettings::persistent(dir.path()))
            .await
            .unwrap();
        store.create(&ctx, &Identity::User(User::new("carol"))).await.unwrap();

        let settings = FileSettings {
            always_create_files: true,
            ..FileSettings::persistent(dir.path())
        };
        let fresh = FileIdentityStore::open(&settings).await.unwrap();
        assert!(fresh.get_user(&ctx, "carol").await.unwrap().is_none());
    }
}
