//! Snapshot storage backends
//!
//! Definitions persist as value snapshots rather than as the external objects
//! themselves, so storage never needs to know the concrete settings types. The
//! file backend writes one TOML document per settings id, atomically via a
//! temp file rename.

use crate::models::{SettingsValue, VersionInfo};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Point-in-time capture of one definition's values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    pub settings_id: String,
    pub version_tag: String,
    pub revision: i32,
    pub saved_at: DateTime<Utc>,
    pub values: BTreeMap<String, SettingsValue>,
}

/// Storage collaborator supplied at container construction
#[cfg_attr(test, mockall::automock)]
pub trait SettingsStorage: Send + Sync {
    /// Fetch the persisted snapshot for a settings id, if any
    fn load(
        &self,
        settings_id: &str,
        version: &VersionInfo,
    ) -> Result<Option<SettingsSnapshot>, PersistenceError>;

    fn save(&self, snapshot: &SettingsSnapshot) -> Result<(), PersistenceError>;

    fn delete(&self, settings_id: &str) -> Result<(), PersistenceError>;
}

/// Location settings for the file backend
#[derive(Debug, Clone)]
pub struct FileStorageConfig {
    pub directory: PathBuf,
}

impl Default for FileStorageConfig {
    fn default() -> Self {
        let directory = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("modconf");
        Self { directory }
    }
}

/// TOML-file-per-definition storage
pub struct FileSettingsStorage {
    config: FileStorageConfig,
}

impl FileSettingsStorage {
    pub fn new(config: FileStorageConfig) -> Self {
        Self { config }
    }

    pub fn with_directory(directory: impl Into<PathBuf>) -> Self {
        Self::new(FileStorageConfig {
            directory: directory.into(),
        })
    }

    fn snapshot_path(&self, settings_id: &str) -> PathBuf {
        // settings ids are caller-supplied, keep them filesystem-safe
        let sanitized: String = settings_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.config.directory.join(format!("{}.toml", sanitized))
    }

    fn write_atomic(&self, path: &Path, contents: &str) -> Result<(), PersistenceError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("toml.tmp");
        std::fs::write(&tmp_path, contents)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

impl SettingsStorage for FileSettingsStorage {
    fn load(
        &self,
        settings_id: &str,
        version: &VersionInfo,
    ) -> Result<Option<SettingsSnapshot>, PersistenceError> {
        let path = self.snapshot_path(settings_id);
        if !path.exists() {
            debug!("No persisted snapshot for '{}'", settings_id);
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)?;
        let snapshot: SettingsSnapshot = toml::from_str(&contents)?;

        if snapshot.version_tag != version.tag() {
            warn!(
                "Snapshot for '{}' was saved under version {} but {} is active; loading anyway",
                settings_id,
                snapshot.version_tag,
                version.tag()
            );
        }

        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &SettingsSnapshot) -> Result<(), PersistenceError> {
        let path = self.snapshot_path(&snapshot.settings_id);
        let contents = toml::to_string_pretty(snapshot)?;
        self.write_atomic(&path, &contents)?;
        debug!(
            "Saved snapshot for '{}' to {}",
            snapshot.settings_id,
            path.display()
        );
        Ok(())
    }

    fn delete(&self, settings_id: &str) -> Result<(), PersistenceError> {
        let path = self.snapshot_path(settings_id);
        if path.exists() {
            std::fs::remove_file(&path)?;
            debug!("Deleted snapshot for '{}'", settings_id);
        }
        Ok(())
    }
}

/// In-memory storage for tests and ephemeral setups
#[derive(Default)]
pub struct MemorySettingsStorage {
    snapshots: Mutex<HashMap<String, SettingsSnapshot>>,
}

impl MemorySettingsStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStorage for MemorySettingsStorage {
    fn load(
        &self,
        settings_id: &str,
        _version: &VersionInfo,
    ) -> Result<Option<SettingsSnapshot>, PersistenceError> {
        let snapshots = self
            .snapshots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(snapshots.get(settings_id).cloned())
    }

    fn save(&self, snapshot: &SettingsSnapshot) -> Result<(), PersistenceError> {
        let mut snapshots = self
            .snapshots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        snapshots.insert(snapshot.settings_id.clone(), snapshot.clone());
        Ok(())
    }

    fn delete(&self, settings_id: &str) -> Result<(), PersistenceError> {
        let mut snapshots = self
            .snapshots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        snapshots.remove(settings_id);
        Ok(())
    }
}
