//! ModConf - Runtime Settings Framework for Moddable Games
//!
//! ModConf discovers mod-defined settings objects at runtime, wraps them behind
//! a uniform property model, tracks per-property history for undo/redo, versions
//! settings schemas across releases, and aggregates independently registered
//! settings containers into one browsable catalog.

pub mod config;
pub mod logging;
pub mod models;
pub mod schema;
pub mod services;

pub use config::*;
pub use models::*;
pub use schema::*;
pub use services::*;

/// Result type alias for ModConf operations
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to ModConf operations
#[derive(thiserror::Error, Debug)]
pub enum ModConfError {
    #[error("Malformed version tag: {0}")]
    MalformedVersionTag(String),

    #[error("Invalid value kind for property '{property}': expected {expected}, got {actual}")]
    InvalidValueKind {
        property: String,
        expected: models::SettingsValueKind,
        actual: models::SettingsValueKind,
    },

    #[error("Unresolvable accessor for property: {0}")]
    UnresolvableAccessor(String),

    #[error("Duplicate settings id: {0}")]
    DuplicateSettingsId(String),

    #[error("Stale reference to settings: {0}")]
    StaleReference(String),

    #[error("Storage error: {0}")]
    Storage(#[from] config::PersistenceError),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}
