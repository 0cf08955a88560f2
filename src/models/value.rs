//! Type-erased settings values
//!
//! Every configurable value a mod exposes is carried as a `SettingsValue`. The
//! kind of a value is fixed when its property is wrapped and never changes
//! afterwards; writes of a different kind are rejected before any side effect.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The dynamic kinds a settings value can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingsValueKind {
    Bool,
    Int,
    Float,
    Text,
}

impl fmt::Display for SettingsValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SettingsValueKind::Bool => "bool",
            SettingsValueKind::Int => "int",
            SettingsValueKind::Float => "float",
            SettingsValueKind::Text => "text",
        };
        write!(f, "{}", name)
    }
}

/// One configurable value read from or written to a settings object
///
/// Serialized untagged so snapshots map onto plain TOML scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingsValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SettingsValue {
    /// The fixed kind of this value
    pub fn kind(&self) -> SettingsValueKind {
        match self {
            SettingsValue::Bool(_) => SettingsValueKind::Bool,
            SettingsValue::Int(_) => SettingsValueKind::Int,
            SettingsValue::Float(_) => SettingsValueKind::Float,
            SettingsValue::Text(_) => SettingsValueKind::Text,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingsValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            SettingsValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            SettingsValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SettingsValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for SettingsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsValue::Bool(value) => write!(f, "{}", value),
            SettingsValue::Int(value) => write!(f, "{}", value),
            SettingsValue::Float(value) => write!(f, "{}", value),
            SettingsValue::Text(value) => write!(f, "{}", value),
        }
    }
}

impl From<bool> for SettingsValue {
    fn from(value: bool) -> Self {
        SettingsValue::Bool(value)
    }
}

impl From<i64> for SettingsValue {
    fn from(value: i64) -> Self {
        SettingsValue::Int(value)
    }
}

impl From<f64> for SettingsValue {
    fn from(value: f64) -> Self {
        SettingsValue::Float(value)
    }
}

impl From<String> for SettingsValue {
    fn from(value: String) -> Self {
        SettingsValue::Text(value)
    }
}

impl From<&str> for SettingsValue {
    fn from(value: &str) -> Self {
        SettingsValue::Text(value.to_string())
    }
}
