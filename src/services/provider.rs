//! Top-level settings provider
//!
//! The provider aggregates every registered container into one catalog,
//! dispatches save/reset/override requests across them, fans session lifecycle
//! out to all of them, and emits events to registered listeners.

use crate::config::SettingsSnapshot;
use crate::models::{natural_cmp, SessionHandle, SettingsDefinition, SettingsHandle};
use crate::services::container::SettingsContainer;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Event emitted to provider listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// A save request matched at least one container
    SaveTriggered { settings_id: String },
}

pub type ProviderListener = Box<dyn Fn(&ProviderEvent) + Send + Sync>;

/// Catalog presentation knobs
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Definitions whose id starts with one of these prefixes sort before
    /// everything else in the browsable catalog
    pub system_id_prefixes: Vec<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            system_id_prefixes: vec!["ModConf".to_string()],
        }
    }
}

/// What one container did with a dispatched request
#[derive(Debug, Clone)]
pub struct ContainerOutcome {
    pub container: String,
    pub matched: bool,
    pub error: Option<String>,
}

/// Per-container outcomes of one dispatched request
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub outcomes: Vec<ContainerOutcome>,
}

impl DispatchReport {
    /// True iff some container matched and nothing errored
    pub fn handled(&self) -> bool {
        self.outcomes.iter().any(|outcome| outcome.matched)
            && self.outcomes.iter().all(|outcome| outcome.error.is_none())
    }

    pub fn matched_any(&self) -> bool {
        self.outcomes.iter().any(|outcome| outcome.matched)
    }
}

/// Aggregates independently registered containers into one settings catalog
pub struct SettingsProvider {
    containers: Vec<Arc<dyn SettingsContainer>>,
    config: ProviderConfig,
    listeners: Mutex<Vec<ProviderListener>>,
}

impl SettingsProvider {
    pub fn builder() -> SettingsProviderBuilder {
        SettingsProviderBuilder::new()
    }

    pub fn add_event_listener(&self, listener: ProviderListener) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(listener);
        }
    }

    fn emit(&self, event: ProviderEvent) {
        if let Ok(listeners) = self.listeners.lock() {
            for listener in listeners.iter() {
                listener(&event);
            }
        }
    }

    /// Every definition from every container, in container registration order.
    ///
    /// No deduplication: two containers exposing the same id both appear, which
    /// surfaces the conflict instead of hiding it.
    pub async fn create_mod_settings_definitions(&self) -> Vec<Arc<SettingsDefinition>> {
        let mut definitions = Vec::new();
        for container in &self.containers {
            definitions.extend(container.create_definitions().await);
        }
        definitions
    }

    /// The browsable catalog: system-prefixed definitions first, then the rest,
    /// each tier alphanumeric-natural by display name
    pub async fn sorted_definitions(&self) -> Vec<Arc<SettingsDefinition>> {
        let mut definitions = self.create_mod_settings_definitions().await;
        definitions.sort_by(|a, b| {
            let a_system = self.is_system(a.settings_id());
            let b_system = self.is_system(b.settings_id());
            b_system
                .cmp(&a_system)
                .then_with(|| natural_cmp(a.display_name(), b.display_name()))
        });
        definitions
    }

    fn is_system(&self, settings_id: &str) -> bool {
        self.config
            .system_id_prefixes
            .iter()
            .any(|prefix| settings_id.starts_with(prefix.as_str()))
    }

    /// Lookup by settings id; containers are scanned in registration order and
    /// the first match wins
    pub async fn get_settings(&self, settings_id: &str) -> Option<Arc<SettingsDefinition>> {
        for container in &self.containers {
            if let Some(definition) = container.get_settings(settings_id).await {
                return Some(definition);
            }
        }
        None
    }

    /// The underlying external settings object for an id, when loaded
    pub async fn get_settings_object(&self, settings_id: &str) -> Option<SettingsHandle> {
        self.get_settings(settings_id)
            .await
            .map(|definition| definition.object_handle())
    }

    /// Dispatch a save to every container. Emits exactly one `SaveTriggered`
    /// when any container matched, regardless of how many did.
    pub async fn save_settings(&self, settings_id: &str) -> DispatchReport {
        let report = self
            .dispatch(settings_id, |container, id| async move {
                container.save_settings(&id).await
            })
            .await;

        if report.matched_any() {
            self.emit(ProviderEvent::SaveTriggered {
                settings_id: settings_id.to_string(),
            });
        } else {
            debug!("Save request for unknown settings id '{}'", settings_id);
        }
        report
    }

    /// Dispatch a reset-to-defaults to every container
    pub async fn reset_settings(&self, settings_id: &str) -> DispatchReport {
        self.dispatch(settings_id, |container, id| async move {
            container.reset_settings(&id).await
        })
        .await
    }

    /// Dispatch an externally supplied snapshot to every container
    pub async fn override_settings(&self, snapshot: &SettingsSnapshot) -> DispatchReport {
        let mut report = DispatchReport::default();
        for container in &self.containers {
            let outcome = match container.override_settings(snapshot).await {
                Ok(matched) => ContainerOutcome {
                    container: container.name().to_string(),
                    matched,
                    error: None,
                },
                Err(error) => {
                    warn!(
                        "Container '{}' failed to override '{}': {}",
                        container.name(),
                        snapshot.settings_id,
                        error
                    );
                    ContainerOutcome {
                        container: container.name().to_string(),
                        matched: false,
                        error: Some(error.to_string()),
                    }
                }
            };
            report.outcomes.push(outcome);
        }
        report
    }

    async fn dispatch<F, Fut>(&self, settings_id: &str, operation: F) -> DispatchReport
    where
        F: Fn(Arc<dyn SettingsContainer>, String) -> Fut,
        Fut: std::future::Future<Output = crate::Result<bool>>,
    {
        let mut report = DispatchReport::default();
        for container in &self.containers {
            let outcome = match operation(container.clone(), settings_id.to_string()).await {
                Ok(matched) => ContainerOutcome {
                    container: container.name().to_string(),
                    matched,
                    error: None,
                },
                Err(error) => {
                    warn!(
                        "Container '{}' failed on '{}': {}",
                        container.name(),
                        settings_id,
                        error
                    );
                    ContainerOutcome {
                        container: container.name().to_string(),
                        matched: false,
                        error: Some(error.to_string()),
                    }
                }
            };
            report.outcomes.push(outcome);
        }
        report
    }

    /// Fan session start out to every container; one failing container never
    /// blocks the rest
    pub async fn on_session_started(&self, session: &SessionHandle) {
        for container in &self.containers {
            if let Err(error) = container.on_session_started(session).await {
                warn!(
                    "Container '{}' failed on session start: {}",
                    container.name(),
                    error
                );
            }
        }
    }

    pub async fn on_session_ended(&self, session: &SessionHandle) {
        for container in &self.containers {
            if let Err(error) = container.on_session_ended(session).await {
                warn!(
                    "Container '{}' failed on session end: {}",
                    container.name(),
                    error
                );
            }
        }
    }
}

/// Builder for [`SettingsProvider`]
#[derive(Default)]
pub struct SettingsProviderBuilder {
    containers: Vec<Arc<dyn SettingsContainer>>,
    config: ProviderConfig,
}

impl SettingsProviderBuilder {
    pub fn new() -> Self {
        Self {
            containers: Vec::new(),
            config: ProviderConfig::default(),
        }
    }

    /// Registration order is lookup precedence
    pub fn container(mut self, container: Arc<dyn SettingsContainer>) -> Self {
        self.containers.push(container);
        self
    }

    pub fn config(mut self, config: ProviderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> SettingsProvider {
        SettingsProvider {
            containers: self.containers,
            config: self.config,
            listeners: Mutex::new(Vec::new()),
        }
    }
}
