//! Uniform property definitions over arbitrary settings objects
//!
//! A `PropertyDefinition` adapts one field on an external, type-erased settings
//! object into the framework's `get`/`set` contract. The accessors are plain
//! closures supplied at registration time; the definition never learns the
//! concrete shape of the object it reads and writes.

use crate::models::undo_redo::{UndoRedoEntry, UndoRedoStack};
use crate::models::value::{SettingsValue, SettingsValueKind};
use crate::{ModConfError, Result};
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

/// Shared handle to the external settings object a property reads and writes.
///
/// The framework references the object, it never owns it: dropping every
/// definition leaves the object intact for whoever else holds the handle.
pub type SettingsHandle = Arc<RwLock<Box<dyn Any + Send + Sync>>>;

/// Type-erased read accessor resolved at registration time
pub type PropertyGetter =
    Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Option<SettingsValue> + Send + Sync>;

/// Type-erased write accessor resolved at registration time; returns whether
/// the write could be applied.
pub type PropertySetter =
    Arc<dyn Fn(&mut (dyn Any + Send + Sync), &SettingsValue) -> bool + Send + Sync>;

/// Display and binding metadata for one property, supplied at registration
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    /// Identifier unique within the owning settings definition
    pub id: String,

    /// Human-readable property name
    pub display_name: String,

    /// Slash-separated group path; empty routes to the default group
    pub group_path: String,

    /// Explicit sort order within the group
    pub order: i32,

    /// Tooltip text shown by the presentation layer
    pub hint: String,

    /// Whether changing this property requires a game restart
    pub require_restart: bool,

    /// The fixed value kind this property accepts
    pub kind: SettingsValueKind,
}

impl PropertyDescriptor {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        kind: SettingsValueKind,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            group_path: String::new(),
            order: -1,
            hint: String::new(),
            require_restart: false,
            kind,
        }
    }

    pub fn with_group(mut self, path: impl Into<String>) -> Self {
        self.group_path = path.into();
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = hint.into();
        self
    }

    pub fn restart_required(mut self) -> Self {
        self.require_restart = true;
        self
    }
}

/// Uniform accessor/mutator pair over one configurable value
pub struct PropertyDefinition {
    descriptor: PropertyDescriptor,
    default_value: SettingsValue,
    object: SettingsHandle,
    getter: PropertyGetter,
    setter: PropertySetter,
    history: Arc<Mutex<UndoRedoStack>>,
}

impl PropertyDefinition {
    /// Bind a described accessor against the live object.
    ///
    /// The accessor is probed once: the current value it yields becomes the
    /// property's default. An accessor that cannot read the object, or reads a
    /// value of the wrong kind, fails the bind; callers exclude the property
    /// from the emitted tree and continue discovery.
    pub fn bind(
        descriptor: PropertyDescriptor,
        object: SettingsHandle,
        getter: PropertyGetter,
        setter: PropertySetter,
        history: Arc<Mutex<UndoRedoStack>>,
    ) -> Result<Arc<Self>> {
        let probed = {
            let guard = object
                .read()
                .map_err(|_| ModConfError::StaleReference(descriptor.id.clone()))?;
            (getter)(&**guard)
        };

        let default_value = match probed {
            Some(value) if value.kind() == descriptor.kind => value,
            Some(value) => {
                return Err(ModConfError::InvalidValueKind {
                    property: descriptor.id.clone(),
                    expected: descriptor.kind,
                    actual: value.kind(),
                }
                .into())
            }
            None => return Err(ModConfError::UnresolvableAccessor(descriptor.id.clone()).into()),
        };

        Ok(Arc::new(Self {
            descriptor,
            default_value,
            object,
            getter,
            setter,
            history,
        }))
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn display_name(&self) -> &str {
        &self.descriptor.display_name
    }

    pub fn group_path(&self) -> &str {
        &self.descriptor.group_path
    }

    pub fn order(&self) -> i32 {
        self.descriptor.order
    }

    pub fn hint(&self) -> &str {
        &self.descriptor.hint
    }

    pub fn require_restart(&self) -> bool {
        self.descriptor.require_restart
    }

    pub fn kind(&self) -> SettingsValueKind {
        self.descriptor.kind
    }

    /// The value captured from the freshly constructed settings object
    pub fn default_value(&self) -> &SettingsValue {
        &self.default_value
    }

    /// Read the live value straight from the underlying object.
    ///
    /// Never cached: changes made outside this API are observed on next read.
    pub fn get(&self) -> Result<SettingsValue> {
        let guard = self
            .object
            .read()
            .map_err(|_| ModConfError::StaleReference(self.descriptor.id.clone()))?;
        (self.getter)(&**guard)
            .ok_or_else(|| ModConfError::UnresolvableAccessor(self.descriptor.id.clone()).into())
    }

    /// Write a value through the uniform mutator, recording an undo entry.
    ///
    /// A value of the wrong kind is rejected with no side effects; the previous
    /// value stays observable through `get`.
    pub fn set(self: &Arc<Self>, value: SettingsValue) -> Result<()> {
        if value.kind() != self.descriptor.kind {
            return Err(ModConfError::InvalidValueKind {
                property: self.descriptor.id.clone(),
                expected: self.descriptor.kind,
                actual: value.kind(),
            }
            .into());
        }

        let old_value = self.get()?;
        self.apply(&value)?;

        let entry = UndoRedoEntry::new(Arc::downgrade(self), old_value, value);
        let mut history = self
            .history
            .lock()
            .map_err(|_| ModConfError::StaleReference(self.descriptor.id.clone()))?;
        history.push(entry);
        Ok(())
    }

    /// Untracked write used by undo/redo replay, snapshot loads, and resets
    pub fn apply(&self, value: &SettingsValue) -> Result<()> {
        if value.kind() != self.descriptor.kind {
            return Err(ModConfError::InvalidValueKind {
                property: self.descriptor.id.clone(),
                expected: self.descriptor.kind,
                actual: value.kind(),
            }
            .into());
        }

        let mut guard = self
            .object
            .write()
            .map_err(|_| ModConfError::StaleReference(self.descriptor.id.clone()))?;
        if (self.setter)(&mut **guard, value) {
            Ok(())
        } else {
            Err(ModConfError::UnresolvableAccessor(self.descriptor.id.clone()).into())
        }
    }
}

impl fmt::Debug for PropertyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDefinition")
            .field("id", &self.descriptor.id)
            .field("kind", &self.descriptor.kind)
            .field("default_value", &self.default_value)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestSettings {
        volume: i64,
    }

    fn test_property() -> Arc<PropertyDefinition> {
        let object: SettingsHandle = Arc::new(RwLock::new(Box::new(TestSettings { volume: 5 })));
        let getter: PropertyGetter = Arc::new(|object| {
            object
                .downcast_ref::<TestSettings>()
                .map(|settings| SettingsValue::Int(settings.volume))
        });
        let setter: PropertySetter = Arc::new(|object, value| {
            match (object.downcast_mut::<TestSettings>(), value.as_int()) {
                (Some(settings), Some(volume)) => {
                    settings.volume = volume;
                    true
                }
                _ => false,
            }
        });

        PropertyDefinition::bind(
            PropertyDescriptor::new("volume", "Volume", SettingsValueKind::Int),
            object,
            getter,
            setter,
            Arc::new(Mutex::new(UndoRedoStack::new())),
        )
        .unwrap()
    }

    #[test]
    fn test_bind_captures_default() {
        let property = test_property();
        assert_eq!(property.default_value(), &SettingsValue::Int(5));
        assert_eq!(property.get().unwrap(), SettingsValue::Int(5));
    }

    #[test]
    fn test_set_reads_back_through_live_object() {
        let property = test_property();
        property.set(SettingsValue::Int(9)).unwrap();
        assert_eq!(property.get().unwrap(), SettingsValue::Int(9));
    }

    #[test]
    fn test_wrong_kind_is_rejected_without_side_effects() {
        let property = test_property();
        let result = property.set(SettingsValue::Bool(true));
        assert!(result.is_err());
        assert_eq!(property.get().unwrap(), SettingsValue::Int(5));
    }

    #[test]
    fn test_bind_fails_on_unresolvable_accessor() {
        struct OtherShape;
        let object: SettingsHandle = Arc::new(RwLock::new(Box::new(OtherShape)));
        let getter: PropertyGetter = Arc::new(|object| {
            object
                .downcast_ref::<TestSettings>()
                .map(|settings| SettingsValue::Int(settings.volume))
        });
        let setter: PropertySetter = Arc::new(|_, _| false);

        let result = PropertyDefinition::bind(
            PropertyDescriptor::new("volume", "Volume", SettingsValueKind::Int),
            object,
            getter,
            setter,
            Arc::new(Mutex::new(UndoRedoStack::new())),
        );
        assert!(result.is_err());
    }
}
