//! Settings containers
//!
//! A container owns a set of registered schemas and controls when their
//! definitions exist. Global containers wrap lazily on first access and stay
//! loaded; per-session containers wrap when a session starts and invalidate
//! everything when it ends.

use crate::config::{SettingsSnapshot, SettingsStorage};
use crate::models::{SessionHandle, SettingsDefinition};
use crate::schema::SettingsSchema;
use crate::{ModConfError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Lifetime class of the definitions a container produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerScope {
    /// Definitions live as long as the process
    Global,
    /// Definitions live between session start and session end
    PerSession,
}

/// One independently registered source of settings definitions
#[async_trait]
pub trait SettingsContainer: Send + Sync {
    fn name(&self) -> &str;

    fn scope(&self) -> ContainerScope;

    /// Every definition this container currently exposes, registration order
    async fn create_definitions(&self) -> Vec<Arc<SettingsDefinition>>;

    /// Lookup by settings id; `None` when the id is not here or not loaded
    async fn get_settings(&self, settings_id: &str) -> Option<Arc<SettingsDefinition>>;

    /// Persist the definition's current values; `false` when the id is not here
    async fn save_settings(&self, settings_id: &str) -> Result<bool>;

    /// Restore defaults and drop the persisted snapshot
    async fn reset_settings(&self, settings_id: &str) -> Result<bool>;

    /// Apply and persist an externally supplied snapshot
    async fn override_settings(&self, snapshot: &SettingsSnapshot) -> Result<bool>;

    async fn on_session_started(&self, _session: &SessionHandle) -> Result<()> {
        Ok(())
    }

    async fn on_session_ended(&self, _session: &SessionHandle) -> Result<()> {
        Ok(())
    }
}

/// Shared wrap/unwrap machinery behind both container kinds.
///
/// `definitions` is `None` while unloaded; loading wraps every schema in
/// parallel and merges results back in registration order.
pub(crate) struct ContainerCatalog {
    name: String,
    schemas: Vec<Arc<SettingsSchema>>,
    storage: Option<Arc<dyn SettingsStorage>>,
    definitions: RwLock<Option<Vec<Arc<SettingsDefinition>>>>,
}

impl ContainerCatalog {
    fn new(
        name: String,
        schemas: Vec<Arc<SettingsSchema>>,
        storage: Option<Arc<dyn SettingsStorage>>,
    ) -> Self {
        Self {
            name,
            schemas,
            storage,
            definitions: RwLock::new(None),
        }
    }

    async fn is_loaded(&self) -> bool {
        self.definitions.read().await.is_some()
    }

    /// Wrap every registered schema. Schemas that fail to wrap are logged and
    /// excluded; the rest of the catalog still loads.
    async fn load(&self) {
        let mut slot = self.definitions.write().await;
        if slot.is_some() {
            return;
        }

        let mut tasks = tokio::task::JoinSet::new();
        for (index, schema) in self.schemas.iter().enumerate() {
            let schema = schema.clone();
            tasks.spawn(async move {
                let id = schema.settings_id().to_string();
                (index, id, schema.instantiate())
            });
        }

        let mut wrapped: Vec<Option<Arc<SettingsDefinition>>> = Vec::new();
        wrapped.resize_with(self.schemas.len(), || None);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, _, Ok(definition))) => wrapped[index] = Some(Arc::new(definition)),
                Ok((_, id, Err(error))) => {
                    warn!(
                        "Excluding '{}' from container '{}': {}",
                        id, self.name, error
                    );
                }
                Err(error) => warn!("Wrap task failed in container '{}': {}", self.name, error),
            }
        }

        let definitions: Vec<Arc<SettingsDefinition>> =
            wrapped.into_iter().flatten().collect();

        // defaults were captured at wrap time; persisted values land afterwards
        if let Some(storage) = &self.storage {
            for definition in &definitions {
                match storage.load(definition.settings_id(), definition.version()) {
                    Ok(Some(snapshot)) => definition.apply_snapshot(&snapshot),
                    Ok(None) => {}
                    Err(error) => warn!(
                        "Failed to load persisted values for '{}': {}",
                        definition.settings_id(),
                        error
                    ),
                }
            }
        }

        info!(
            "Container '{}' loaded {} of {} definitions",
            self.name,
            definitions.len(),
            self.schemas.len()
        );
        *slot = Some(definitions);
    }

    /// Drop every definition; later reads see the container as unloaded
    async fn unload(&self) {
        let mut slot = self.definitions.write().await;
        if slot.take().is_some() {
            debug!("Container '{}' unloaded", self.name);
        }
    }

    async fn definitions(&self) -> Vec<Arc<SettingsDefinition>> {
        self.definitions
            .read()
            .await
            .as_deref()
            .map(|definitions| definitions.to_vec())
            .unwrap_or_default()
    }

    async fn get(&self, settings_id: &str) -> Option<Arc<SettingsDefinition>> {
        self.definitions
            .read()
            .await
            .as_deref()
            .and_then(|definitions| {
                definitions
                    .iter()
                    .find(|definition| definition.settings_id() == settings_id)
                    .cloned()
            })
    }

    async fn save(&self, settings_id: &str) -> Result<bool> {
        let Some(definition) = self.get(settings_id).await else {
            return Ok(false);
        };

        if let Some(storage) = &self.storage {
            storage
                .save(&definition.snapshot())
                .map_err(ModConfError::Storage)?;
        }
        // the persisted state is the new baseline
        definition.clear_stack();
        info!("Saved settings '{}'", settings_id);
        Ok(true)
    }

    async fn reset(&self, settings_id: &str) -> Result<bool> {
        let Some(definition) = self.get(settings_id).await else {
            return Ok(false);
        };

        definition.restore_defaults();
        definition.clear_stack();
        if let Some(storage) = &self.storage {
            storage.delete(settings_id).map_err(ModConfError::Storage)?;
        }
        info!("Reset settings '{}' to defaults", settings_id);
        Ok(true)
    }

    async fn override_with(&self, snapshot: &SettingsSnapshot) -> Result<bool> {
        let Some(definition) = self.get(&snapshot.settings_id).await else {
            return Ok(false);
        };

        definition.apply_snapshot(snapshot);
        definition.clear_stack();
        if let Some(storage) = &self.storage {
            storage
                .save(&definition.snapshot())
                .map_err(ModConfError::Storage)?;
        }
        info!("Overrode settings '{}'", snapshot.settings_id);
        Ok(true)
    }
}

/// Container whose definitions are wrapped once and kept for the process
/// lifetime
pub struct GlobalSettingsContainer {
    catalog: ContainerCatalog,
}

impl GlobalSettingsContainer {
    pub fn builder(name: impl Into<String>) -> GlobalSettingsContainerBuilder {
        GlobalSettingsContainerBuilder::new(name)
    }

    async fn ensure_loaded(&self) {
        if !self.catalog.is_loaded().await {
            self.catalog.load().await;
        }
    }
}

#[async_trait]
impl SettingsContainer for GlobalSettingsContainer {
    fn name(&self) -> &str {
        &self.catalog.name
    }

    fn scope(&self) -> ContainerScope {
        ContainerScope::Global
    }

    async fn create_definitions(&self) -> Vec<Arc<SettingsDefinition>> {
        self.ensure_loaded().await;
        self.catalog.definitions().await
    }

    async fn get_settings(&self, settings_id: &str) -> Option<Arc<SettingsDefinition>> {
        self.ensure_loaded().await;
        self.catalog.get(settings_id).await
    }

    async fn save_settings(&self, settings_id: &str) -> Result<bool> {
        self.ensure_loaded().await;
        self.catalog.save(settings_id).await
    }

    async fn reset_settings(&self, settings_id: &str) -> Result<bool> {
        self.ensure_loaded().await;
        self.catalog.reset(settings_id).await
    }

    async fn override_settings(&self, snapshot: &SettingsSnapshot) -> Result<bool> {
        self.ensure_loaded().await;
        self.catalog.override_with(snapshot).await
    }
}

/// Builder for [`GlobalSettingsContainer`]
pub struct GlobalSettingsContainerBuilder {
    name: String,
    schemas: Vec<Arc<SettingsSchema>>,
    storage: Option<Arc<dyn SettingsStorage>>,
}

impl GlobalSettingsContainerBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schemas: Vec::new(),
            storage: None,
        }
    }

    pub fn register(mut self, schema: SettingsSchema) -> Self {
        self.schemas.push(Arc::new(schema));
        self
    }

    pub fn storage(mut self, storage: Arc<dyn SettingsStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Fails on duplicate settings ids; a container must expose each id once
    pub fn build(self) -> Result<GlobalSettingsContainer> {
        reject_duplicate_ids(&self.schemas)?;
        Ok(GlobalSettingsContainer {
            catalog: ContainerCatalog::new(self.name, self.schemas, self.storage),
        })
    }
}

/// Container whose definitions exist only while a session is active
pub struct PerSessionSettingsContainer {
    catalog: ContainerCatalog,
    current_session: RwLock<Option<SessionHandle>>,
}

impl PerSessionSettingsContainer {
    pub fn builder(name: impl Into<String>) -> PerSessionSettingsContainerBuilder {
        PerSessionSettingsContainerBuilder::new(name)
    }

    pub async fn current_session(&self) -> Option<SessionHandle> {
        self.current_session.read().await.clone()
    }
}

#[async_trait]
impl SettingsContainer for PerSessionSettingsContainer {
    fn name(&self) -> &str {
        &self.catalog.name
    }

    fn scope(&self) -> ContainerScope {
        ContainerScope::PerSession
    }

    async fn create_definitions(&self) -> Vec<Arc<SettingsDefinition>> {
        self.catalog.definitions().await
    }

    async fn get_settings(&self, settings_id: &str) -> Option<Arc<SettingsDefinition>> {
        self.catalog.get(settings_id).await
    }

    async fn save_settings(&self, settings_id: &str) -> Result<bool> {
        self.catalog.save(settings_id).await
    }

    async fn reset_settings(&self, settings_id: &str) -> Result<bool> {
        self.catalog.reset(settings_id).await
    }

    async fn override_settings(&self, snapshot: &SettingsSnapshot) -> Result<bool> {
        self.catalog.override_with(snapshot).await
    }

    async fn on_session_started(&self, session: &SessionHandle) -> Result<()> {
        let mut current = self.current_session.write().await;
        if let Some(previous) = current.as_ref() {
            warn!(
                "Session '{}' started while '{}' was still active in '{}'; unloading the old one",
                session.label(),
                previous.label(),
                self.catalog.name
            );
            self.catalog.unload().await;
        }
        *current = Some(session.clone());
        drop(current);

        self.catalog.load().await;
        info!(
            "Container '{}' attached to session '{}'",
            self.catalog.name,
            session.label()
        );
        Ok(())
    }

    async fn on_session_ended(&self, session: &SessionHandle) -> Result<()> {
        let mut current = self.current_session.write().await;
        match current.as_ref() {
            Some(active) if active == session => {
                *current = None;
                drop(current);
                self.catalog.unload().await;
                info!(
                    "Container '{}' detached from session '{}'",
                    self.catalog.name,
                    session.label()
                );
            }
            _ => {
                // an end for a session we never attached to is not an error
                debug!(
                    "Container '{}' ignoring end of unknown session '{}'",
                    self.catalog.name,
                    session.label()
                );
            }
        }
        Ok(())
    }
}

/// Builder for [`PerSessionSettingsContainer`]
pub struct PerSessionSettingsContainerBuilder {
    name: String,
    schemas: Vec<Arc<SettingsSchema>>,
    storage: Option<Arc<dyn SettingsStorage>>,
}

impl PerSessionSettingsContainerBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schemas: Vec::new(),
            storage: None,
        }
    }

    pub fn register(mut self, schema: SettingsSchema) -> Self {
        self.schemas.push(Arc::new(schema));
        self
    }

    pub fn storage(mut self, storage: Arc<dyn SettingsStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn build(self) -> Result<PerSessionSettingsContainer> {
        reject_duplicate_ids(&self.schemas)?;
        Ok(PerSessionSettingsContainer {
            catalog: ContainerCatalog::new(self.name, self.schemas, self.storage),
            current_session: RwLock::new(None),
        })
    }
}

fn reject_duplicate_ids(schemas: &[Arc<SettingsSchema>]) -> Result<()> {
    for (index, schema) in schemas.iter().enumerate() {
        let duplicate = schemas[..index]
            .iter()
            .any(|earlier| earlier.settings_id() == schema.settings_id());
        if duplicate {
            return Err(ModConfError::DuplicateSettingsId(schema.settings_id().to_string()).into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemorySettingsStorage;
    use crate::models::{PropertyDescriptor, SettingsValue, SettingsValueKind};

    #[derive(Default)]
    struct AudioSettings {
        volume: i64,
    }

    fn audio_schema(settings_id: &str) -> SettingsSchema {
        SettingsSchema::builder(settings_id, settings_id)
            .version("e1.0.0", 1)
            .factory(AudioSettings::default)
            .int_property(
                PropertyDescriptor::new("volume", "Volume", SettingsValueKind::Int),
                |settings: &AudioSettings| settings.volume,
                |settings, value| settings.volume = value,
            )
            .build()
            .unwrap()
    }

    fn set_volume(definition: &Arc<SettingsDefinition>, volume: i64) {
        let properties = definition.properties();
        let property = properties
            .iter()
            .find(|property| property.id() == "volume")
            .unwrap();
        property.set(SettingsValue::Int(volume)).unwrap();
    }

    fn read_volume(definition: &Arc<SettingsDefinition>) -> i64 {
        definition.properties()[0].get().unwrap().as_int().unwrap()
    }

    #[tokio::test]
    async fn test_global_container_loads_once() {
        let container = GlobalSettingsContainer::builder("global")
            .register(audio_schema("Mod_A"))
            .build()
            .unwrap();

        let first = container.get_settings("Mod_A").await.unwrap();
        let second = container.get_settings("Mod_A").await.unwrap();
        // same wrapped definition across repeated access
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected() {
        let result = GlobalSettingsContainer::builder("global")
            .register(audio_schema("Mod_A"))
            .register(audio_schema("Mod_A"))
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_save_persists_and_clears_history() {
        let storage = Arc::new(MemorySettingsStorage::new());
        let container = GlobalSettingsContainer::builder("global")
            .register(audio_schema("Mod_A"))
            .storage(storage.clone())
            .build()
            .unwrap();

        let definition = container.get_settings("Mod_A").await.unwrap();
        set_volume(&definition, 9);
        assert!(definition.changes_made());

        assert!(container.save_settings("Mod_A").await.unwrap());
        assert!(!definition.changes_made());

        let snapshot = storage
            .load("Mod_A", definition.version())
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.values.get("volume"), Some(&SettingsValue::Int(9)));
    }

    #[tokio::test]
    async fn test_load_applies_persisted_values_over_defaults() {
        let storage = Arc::new(MemorySettingsStorage::new());
        {
            let container = GlobalSettingsContainer::builder("global")
                .register(audio_schema("Mod_A"))
                .storage(storage.clone())
                .build()
                .unwrap();
            let definition = container.get_settings("Mod_A").await.unwrap();
            set_volume(&definition, 7);
            container.save_settings("Mod_A").await.unwrap();
        }

        // fresh container over the same storage sees the persisted value but a
        // pristine default
        let container = GlobalSettingsContainer::builder("global")
            .register(audio_schema("Mod_A"))
            .storage(storage)
            .build()
            .unwrap();
        let definition = container.get_settings("Mod_A").await.unwrap();
        assert_eq!(read_volume(&definition), 7);
        assert_eq!(
            definition.properties()[0].default_value(),
            &SettingsValue::Int(0)
        );
        assert!(!definition.changes_made());
    }

    #[tokio::test]
    async fn test_reset_restores_defaults_and_deletes_snapshot() {
        let storage = Arc::new(MemorySettingsStorage::new());
        let container = GlobalSettingsContainer::builder("global")
            .register(audio_schema("Mod_A"))
            .storage(storage.clone())
            .build()
            .unwrap();

        let definition = container.get_settings("Mod_A").await.unwrap();
        set_volume(&definition, 11);
        container.save_settings("Mod_A").await.unwrap();

        assert!(container.reset_settings("Mod_A").await.unwrap());
        assert_eq!(read_volume(&definition), 0);
        assert!(storage
            .load("Mod_A", definition.version())
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_unknown_id_is_unmatched_not_error() {
        let container = GlobalSettingsContainer::builder("global")
            .register(audio_schema("Mod_A"))
            .build()
            .unwrap();

        assert!(!container.save_settings("Absent").await.unwrap());
        assert!(container.get_settings("Absent").await.is_none());
    }

    #[tokio::test]
    async fn test_broken_schema_excluded_others_load() {
        let broken = SettingsSchema::builder("Mod_Broken", "Broken")
            .version("garbage", 0)
            .factory(AudioSettings::default)
            .build()
            .unwrap();

        let container = GlobalSettingsContainer::builder("global")
            .register(broken)
            .register(audio_schema("Mod_A"))
            .build()
            .unwrap();

        let definitions = container.create_definitions().await;
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].settings_id(), "Mod_A");
    }

    #[tokio::test]
    async fn test_storage_load_failure_still_yields_defaults() {
        use crate::config::{MockSettingsStorage, PersistenceError};

        let mut storage = MockSettingsStorage::new();
        storage.expect_load().returning(|_, _| {
            Err(PersistenceError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "disk on fire",
            )))
        });

        let container = GlobalSettingsContainer::builder("global")
            .register(audio_schema("Mod_A"))
            .storage(Arc::new(storage))
            .build()
            .unwrap();

        // the definition still wraps; it just keeps its defaults
        let definition = container.get_settings("Mod_A").await.unwrap();
        assert_eq!(read_volume(&definition), 0);
    }

    #[tokio::test]
    async fn test_per_session_lifecycle() {
        let container = PerSessionSettingsContainer::builder("session")
            .register(audio_schema("Mod_S"))
            .build()
            .unwrap();

        // nothing exists before a session starts
        assert!(container.get_settings("Mod_S").await.is_none());

        let session = SessionHandle::new("campaign");
        container.on_session_started(&session).await.unwrap();
        let first = container.get_settings("Mod_S").await.unwrap();

        container.on_session_ended(&session).await.unwrap();
        assert!(container.get_settings("Mod_S").await.is_none());

        // a new session gets a fresh wrapped object
        let next = SessionHandle::new("campaign");
        container.on_session_started(&next).await.unwrap();
        let second = container.get_settings("Mod_S").await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_mismatched_session_end_is_ignored() {
        let container = PerSessionSettingsContainer::builder("session")
            .register(audio_schema("Mod_S"))
            .build()
            .unwrap();

        let active = SessionHandle::new("campaign");
        container.on_session_started(&active).await.unwrap();

        let stranger = SessionHandle::new("other");
        container.on_session_ended(&stranger).await.unwrap();

        // still loaded for the active session
        assert!(container.get_settings("Mod_S").await.is_some());
    }
}
