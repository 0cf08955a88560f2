//! Root settings aggregates discovered per mod
//!
//! A `SettingsDefinition` is the uniform description of one mod's settings
//! object: identity, resolved schema version, the property group tree, a shared
//! handle to the underlying object, and the change journal that decides when
//! the definition is persisted.

use crate::config::persistence::SettingsSnapshot;
use crate::models::group::PropertyGroupDefinition;
use crate::models::property::{PropertyDefinition, SettingsHandle};
use crate::models::undo_redo::UndoRedoStack;
use crate::models::version::VersionInfo;
use chrono::Utc;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// The root aggregate for one mod's settings
pub struct SettingsDefinition {
    settings_id: String,
    display_name: String,
    version: VersionInfo,
    root: PropertyGroupDefinition,
    object: SettingsHandle,
    is_wrapper: bool,
    history: Arc<Mutex<UndoRedoStack>>,
}

impl SettingsDefinition {
    pub fn new(
        settings_id: impl Into<String>,
        display_name: impl Into<String>,
        version: VersionInfo,
        root: PropertyGroupDefinition,
        object: SettingsHandle,
        is_wrapper: bool,
        history: Arc<Mutex<UndoRedoStack>>,
    ) -> Self {
        Self {
            settings_id: settings_id.into(),
            display_name: display_name.into(),
            version,
            root,
            object,
            is_wrapper,
            history,
        }
    }

    /// The aggregation key, unique across the whole provider
    pub fn settings_id(&self) -> &str {
        &self.settings_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn version(&self) -> &VersionInfo {
        &self.version
    }

    pub fn root(&self) -> &PropertyGroupDefinition {
        &self.root
    }

    /// Raw handle to the underlying external settings object
    pub fn object_handle(&self) -> SettingsHandle {
        self.object.clone()
    }

    /// Whether this definition is a thin wrapper around an object registered
    /// elsewhere
    pub fn is_wrapper(&self) -> bool {
        self.is_wrapper
    }

    /// Every property in the tree, depth-first
    pub fn properties(&self) -> Vec<Arc<PropertyDefinition>> {
        let mut properties = Vec::new();
        self.root.collect_properties(&mut properties);
        properties
    }

    /// True iff any tracked change has not been undone or saved
    pub fn changes_made(&self) -> bool {
        self.history
            .lock()
            .map(|history| history.changes_made())
            .unwrap_or(false)
    }

    pub fn undo(&self) {
        if let Ok(mut history) = self.history.lock() {
            history.undo();
        }
    }

    pub fn redo(&self) {
        if let Ok(mut history) = self.history.lock() {
            history.redo();
        }
    }

    /// Revert every tracked change and drop the journal; used on cancel
    pub fn undo_all(&self) {
        if let Ok(mut history) = self.history.lock() {
            history.undo_all();
        }
    }

    /// Drop the journal without reverting; used after a successful save
    pub fn clear_stack(&self) {
        if let Ok(mut history) = self.history.lock() {
            history.clear();
        }
    }

    /// Whether any changed property requires a game restart to take effect
    pub fn restart_required(&self) -> bool {
        self.properties().iter().any(|property| {
            property.require_restart()
                && property
                    .get()
                    .map(|value| &value != property.default_value())
                    .unwrap_or(false)
        })
    }

    /// Capture the current live values for persistence
    pub fn snapshot(&self) -> SettingsSnapshot {
        let mut values = BTreeMap::new();
        for property in self.properties() {
            match property.get() {
                Ok(value) => {
                    values.insert(property.id().to_string(), value);
                }
                Err(error) => {
                    warn!(
                        "Omitting unreadable property '{}' from snapshot of '{}': {}",
                        property.id(),
                        self.settings_id,
                        error
                    );
                }
            }
        }

        SettingsSnapshot {
            settings_id: self.settings_id.clone(),
            version_tag: self.version.tag().to_string(),
            revision: self.version.revision(),
            saved_at: Utc::now(),
            values,
        }
    }

    /// Apply persisted values onto the live object, untracked.
    ///
    /// Tolerant of schema evolution in both directions: snapshot values with no
    /// matching property are ignored, properties missing from the snapshot keep
    /// their defaults, and kind mismatches are skipped.
    pub fn apply_snapshot(&self, snapshot: &SettingsSnapshot) {
        let mut applied = 0usize;
        for property in self.properties() {
            if let Some(value) = snapshot.values.get(property.id()) {
                match property.apply(value) {
                    Ok(()) => applied += 1,
                    Err(error) => warn!(
                        "Skipping persisted value for '{}' of '{}': {}",
                        property.id(),
                        self.settings_id,
                        error
                    ),
                }
            }
        }
        debug!(
            "Applied {}/{} persisted values to '{}'",
            applied,
            snapshot.values.len(),
            self.settings_id
        );
    }

    /// Put every property back to the value captured at wrap time
    pub fn restore_defaults(&self) {
        for property in self.properties() {
            let default = property.default_value().clone();
            if let Err(error) = property.apply(&default) {
                warn!(
                    "Failed to restore default for '{}' of '{}': {}",
                    property.id(),
                    self.settings_id,
                    error
                );
            }
        }
    }
}

impl fmt::Debug for SettingsDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsDefinition")
            .field("settings_id", &self.settings_id)
            .field("display_name", &self.display_name)
            .field("version", &self.version)
            .field("is_wrapper", &self.is_wrapper)
            .finish()
    }
}
