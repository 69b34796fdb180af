//! Runtime settings for the identity runtime.
//!
//! Settings are read from environment variables (optionally seeded from a
//! `.env` file) and fall back to defaults that work without any backend:
//! an in-memory file store and no structured persistence unit.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name of the realm used when a caller does not address one explicitly.
pub const DEFAULT_REALM: &str = "default";

/// Main settings structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Realm assumed by scopes that do not name one.
    pub default_realm: String,
    /// Settings for the file-backed store.
    pub file_store: FileStoreConfig,
    /// Settings describing the structured persistence unit, if any.
    pub jpa: JpaConfig,
    /// Log filter directive.
    pub log_level: String,
}

/// File-backed store settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStoreConfig {
    /// Directory holding the data files. `None` keeps everything in memory.
    pub working_dir: Option<PathBuf>,
    /// Discard existing data files when the store is opened.
    pub always_create_files: bool,
    /// Skip syncing data files to disk after each write.
    pub async_write: bool,
}

/// Structured persistence unit settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JpaConfig {
    /// Persistence unit name.
    pub persistence_unit: Option<String>,
    /// Entity descriptors mapped in the persistence unit.
    pub mapped_entities: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_realm: DEFAULT_REALM.to_string(),
            file_store: FileStoreConfig::default(),
            jpa: JpaConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Loads settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a boolean setting cannot be parsed.
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings through an arbitrary lookup function.
    ///
    /// # Errors
    ///
    /// Returns an error if a boolean setting cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let default_realm = lookup("IDM_DEFAULT_REALM")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.default_realm);

        let working_dir = lookup("IDM_FILE_WORKING_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let always_create_files = parse_bool(&lookup, "IDM_FILE_ALWAYS_CREATE", false)?;
        let async_write = parse_bool(&lookup, "IDM_FILE_ASYNC_WRITE", false)?;

        let persistence_unit = lookup("IDM_JPA_PERSISTENCE_UNIT").filter(|v| !v.trim().is_empty());
        let mapped_entities = lookup("IDM_JPA_ENTITIES")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let log_level = lookup("RUST_LOG").unwrap_or(defaults.log_level);

        Ok(Self {
            default_realm,
            file_store: FileStoreConfig {
                working_dir,
                always_create_files,
                async_write,
            },
            jpa: JpaConfig {
                persistence_unit,
                mapped_entities,
            },
            log_level,
        })
    }
}

fn parse_bool<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(Error::invalid_value(key, raw)),
        },
    }
}
