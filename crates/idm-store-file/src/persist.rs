//! Mirrors realm partitions to JSON files in the working directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use idm_storage::{StorageError, StorageResult};
use tokio::io::AsyncWriteExt;

use crate::partition::{Partition, Snapshot};

const FILE_PREFIX: &str = "realm-";
const FILE_SUFFIX: &str = ".json";

fn serialization_error(err: serde_json::Error) -> StorageError {
    StorageError::Serialization(err.to_string())
}

#[derive(Debug)]
pub(crate) struct DataFiles {
    dir: PathBuf,
    sync: bool,
}

impl DataFiles {
    /// Prepares `dir`, discarding existing data files when `truncate` is set.
    pub async fn open(dir: &Path, truncate: bool, sync: bool) -> StorageResult<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let files = Self {
            dir: dir.to_path_buf(),
            sync,
        };

        if truncate {
            for (realm, path) in files.existing().await? {
                tracing::debug!(realm = %realm, path = %path.display(), "Discarding data file");
                tokio::fs::remove_file(&path).await?;
            }
        }
        Ok(files)
    }

    async fn existing(&self) -> StorageResult<Vec<(String, PathBuf)>> {
        let mut found = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(realm) = name
                .strip_prefix(FILE_PREFIX)
                .and_then(|rest| rest.strip_suffix(FILE_SUFFIX))
            {
                found.push((realm.to_string(), entry.path()));
            }
        }
        Ok(found)
    }

    /// Reads every realm file in the directory.
    pub async fn load_all(&self) -> StorageResult<HashMap<String, Partition>> {
        let mut partitions = HashMap::new();
        for (realm, path) in self.existing().await? {
            let bytes = tokio::fs::read(&path).await?;
            let snapshot: Snapshot = serde_json::from_slice(&bytes).map_err(serialization_error)?;
            tracing::debug!(
                realm = %realm,
                identities = snapshot.identities.len(),
                relationships = snapshot.relationships.len(),
                "Loaded realm data file"
            );
            partitions.insert(realm, Partition::from_snapshot(snapshot));
        }
        Ok(partitions)
    }

    pub fn path_for(&self, realm: &str) -> StorageResult<PathBuf> {
        if realm.is_empty() || realm.contains(['/', '\\']) || realm.starts_with('.') {
            return Err(StorageError::InvalidData(format!(
                "realm name '{realm}' can not be used as a file name"
            )));
        }
        Ok(self.dir.join(format!("{FILE_PREFIX}{realm}{FILE_SUFFIX}")))
    }

    /// Replaces the data file of `realm` with `snapshot`.
    pub async fn write(&self, realm: &str, snapshot: &Snapshot) -> StorageResult<()> {
        let path = self.path_for(realm)?;
        let bytes = serde_json::to_vec_pretty(snapshot).map_err(serialization_error)?;

        let tmp = path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        if self.sync {
            file.sync_all().await?;
        } else {
            file.flush().await?;
        }
        drop(file);
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}
