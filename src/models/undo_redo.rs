//! Per-definition undo/redo change journal
//!
//! Every tracked write on a settings definition lands here as a
//! `(property, old, new)` triple. The journal decides whether a definition is
//! dirty and therefore whether it gets persisted on commit.

use crate::models::property::PropertyDefinition;
use crate::models::value::SettingsValue;
use std::fmt;
use std::sync::Weak;
use tracing::debug;

/// One recorded property mutation
pub struct UndoRedoEntry {
    property: Weak<PropertyDefinition>,
    old_value: SettingsValue,
    new_value: SettingsValue,
}

impl UndoRedoEntry {
    pub fn new(
        property: Weak<PropertyDefinition>,
        old_value: SettingsValue,
        new_value: SettingsValue,
    ) -> Self {
        Self {
            property,
            old_value,
            new_value,
        }
    }

    pub fn old_value(&self) -> &SettingsValue {
        &self.old_value
    }

    pub fn new_value(&self) -> &SettingsValue {
        &self.new_value
    }

    /// Apply a value to the target property. Entries whose property has been
    /// invalidated by a container unload are skipped, not faulted.
    fn replay(&self, value: &SettingsValue) {
        match self.property.upgrade() {
            Some(property) => {
                if let Err(error) = property.apply(value) {
                    debug!(
                        "Skipping history entry for '{}': {}",
                        property.id(),
                        error
                    );
                }
            }
            None => debug!("Skipping history entry for an unloaded property"),
        }
    }
}

impl fmt::Debug for UndoRedoEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoRedoEntry")
            .field("old_value", &self.old_value)
            .field("new_value", &self.new_value)
            .finish()
    }
}

/// Linear change journal with an undo side and a redo side
#[derive(Debug, Default)]
pub struct UndoRedoStack {
    undo: Vec<UndoRedoEntry>,
    redo: Vec<UndoRedoEntry>,
}

impl UndoRedoStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff any un-undone change is on record
    pub fn changes_made(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Record a fresh change; anything redoable is discarded
    pub fn push(&mut self, entry: UndoRedoEntry) {
        self.undo.push(entry);
        self.redo.clear();
    }

    /// Step the most recent change back
    pub fn undo(&mut self) {
        if let Some(entry) = self.undo.pop() {
            entry.replay(&entry.old_value);
            self.redo.push(entry);
        }
    }

    /// Re-apply the most recently undone change
    pub fn redo(&mut self) {
        if let Some(entry) = self.redo.pop() {
            entry.replay(&entry.new_value);
            self.undo.push(entry);
        }
    }

    /// Revert every recorded change in reverse order, then drop all history.
    /// Used on cancel.
    pub fn undo_all(&mut self) {
        while let Some(entry) = self.undo.pop() {
            entry.replay(&entry.old_value);
        }
        self.redo.clear();
    }

    /// Drop all history without reverting. Used after a successful save, since
    /// the persisted state is the new baseline.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::property::{
        PropertyDescriptor, PropertyGetter, PropertySetter, SettingsHandle,
    };
    use crate::models::value::SettingsValueKind;
    use std::sync::{Arc, Mutex, RwLock};

    struct Fixture {
        gamma: f64,
    }

    fn fixture() -> (Arc<PropertyDefinition>, Arc<Mutex<UndoRedoStack>>) {
        let object: SettingsHandle = Arc::new(RwLock::new(Box::new(Fixture { gamma: 1.0 })));
        let getter: PropertyGetter = Arc::new(|object| {
            object
                .downcast_ref::<Fixture>()
                .map(|fixture| SettingsValue::Float(fixture.gamma))
        });
        let setter: PropertySetter = Arc::new(|object, value| {
            match (object.downcast_mut::<Fixture>(), value.as_float()) {
                (Some(fixture), Some(gamma)) => {
                    fixture.gamma = gamma;
                    true
                }
                _ => false,
            }
        });
        let history = Arc::new(Mutex::new(UndoRedoStack::new()));
        let property = PropertyDefinition::bind(
            PropertyDescriptor::new("gamma", "Gamma", SettingsValueKind::Float),
            object,
            getter,
            setter,
            history.clone(),
        )
        .unwrap();
        (property, history)
    }

    #[test]
    fn test_undo_all_restores_initial_values() {
        let (property, history) = fixture();
        property.set(SettingsValue::Float(1.5)).unwrap();
        property.set(SettingsValue::Float(2.0)).unwrap();
        assert!(history.lock().unwrap().changes_made());

        history.lock().unwrap().undo_all();
        assert_eq!(property.get().unwrap(), SettingsValue::Float(1.0));
        assert!(!history.lock().unwrap().changes_made());
    }

    #[test]
    fn test_single_step_undo_and_redo() {
        let (property, history) = fixture();
        property.set(SettingsValue::Float(1.5)).unwrap();
        property.set(SettingsValue::Float(2.0)).unwrap();

        history.lock().unwrap().undo();
        assert_eq!(property.get().unwrap(), SettingsValue::Float(1.5));

        history.lock().unwrap().redo();
        assert_eq!(property.get().unwrap(), SettingsValue::Float(2.0));
    }

    #[test]
    fn test_push_clears_redo_side() {
        let (property, history) = fixture();
        property.set(SettingsValue::Float(1.5)).unwrap();
        history.lock().unwrap().undo();

        property.set(SettingsValue::Float(3.0)).unwrap();
        history.lock().unwrap().redo();
        // redo had nothing to re-apply
        assert_eq!(property.get().unwrap(), SettingsValue::Float(3.0));
    }

    #[test]
    fn test_clear_keeps_values_and_makes_undo_a_noop() {
        let (property, history) = fixture();
        property.set(SettingsValue::Float(2.5)).unwrap();

        history.lock().unwrap().clear();
        assert!(!history.lock().unwrap().changes_made());

        history.lock().unwrap().undo_all();
        assert_eq!(property.get().unwrap(), SettingsValue::Float(2.5));
    }

    #[test]
    fn test_stale_entries_are_skipped() {
        let (property, history) = fixture();
        property.set(SettingsValue::Float(2.5)).unwrap();
        drop(property);

        // must not panic or fault once the property is gone
        history.lock().unwrap().undo_all();
        assert!(!history.lock().unwrap().changes_made());
    }
}
