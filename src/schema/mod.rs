//! Registration-time adaptation of external settings objects
//!
//! Instead of runtime introspection, a mod describes its settings object once
//! at registration: an object factory, the schema versions it declares, and an
//! explicit `{get, set, kind}` triple per property. A `SettingsSchema` is the
//! complete statically-typed description a container wraps into a
//! `SettingsDefinition` tree at load time.

use crate::models::{
    PropertyDefinition, PropertyDescriptor, PropertyGetter, PropertyGroupDefinition,
    PropertySetter, SettingsDefinition, SettingsHandle, SettingsValue, SettingsValueKind,
    UndoRedoStack, VersionInfo, DEFAULT_GROUP_NAME,
};
use crate::{ModConfError, Result};
use std::any::Any;
use std::sync::{Arc, Mutex, RwLock};
use tracing::warn;

/// Factory producing a fresh, default-valued settings object
pub type SettingsObjectFactory = Arc<dyn Fn() -> Box<dyn Any + Send + Sync> + Send + Sync>;

struct PropertySpec {
    descriptor: PropertyDescriptor,
    getter: PropertyGetter,
    setter: PropertySetter,
}

struct GroupSpec {
    path: String,
    order: i32,
    display_name_override: Option<String>,
}

/// Complete registration-time description of one mod's settings object
pub struct SettingsSchema {
    settings_id: String,
    display_name: String,
    versions: Vec<(String, i32)>,
    factory: SettingsObjectFactory,
    properties: Vec<PropertySpec>,
    groups: Vec<GroupSpec>,
    is_wrapper: bool,
}

impl SettingsSchema {
    pub fn builder(
        settings_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> SettingsSchemaBuilder {
        SettingsSchemaBuilder::new(settings_id, display_name)
    }

    pub fn settings_id(&self) -> &str {
        &self.settings_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Instantiate a fresh settings object and wrap it into a definition tree.
    ///
    /// Individual properties that fail to bind are logged and omitted so one
    /// broken property in a third-party mod never aborts discovery of the
    /// rest. A schema whose declared versions are all malformed fails as a
    /// whole and is excluded by the calling container.
    pub fn instantiate(&self) -> Result<SettingsDefinition> {
        let version = VersionInfo::resolve(&self.versions)?;
        let object: SettingsHandle = Arc::new(RwLock::new((self.factory)()));
        let history = Arc::new(Mutex::new(UndoRedoStack::new()));

        let mut root = PropertyGroupDefinition::root();

        // declared groups first, so explicit orders and display names survive
        // lazy creation by property paths
        for group in &self.groups {
            let node = root.get_group_for(&group.path);
            node.set_order(group.order);
            if let Some(display_name) = &group.display_name_override {
                node.set_display_name_override(display_name.clone());
            }
        }

        for spec in &self.properties {
            let path = if spec.descriptor.group_path.trim().is_empty() {
                DEFAULT_GROUP_NAME
            } else {
                spec.descriptor.group_path.as_str()
            };
            match PropertyDefinition::bind(
                spec.descriptor.clone(),
                object.clone(),
                spec.getter.clone(),
                spec.setter.clone(),
                history.clone(),
            ) {
                Ok(property) => root.get_group_for(path).add_property(property),
                Err(error) => warn!(
                    "Excluding property '{}' of '{}' that failed to bind: {}",
                    spec.descriptor.id, self.settings_id, error
                ),
            }
        }

        Ok(SettingsDefinition::new(
            self.settings_id.clone(),
            self.display_name.clone(),
            version,
            root,
            object,
            self.is_wrapper,
            history,
        ))
    }
}

/// Builder assembling a `SettingsSchema` from typed property registrations
pub struct SettingsSchemaBuilder {
    settings_id: String,
    display_name: String,
    versions: Vec<(String, i32)>,
    factory: Option<SettingsObjectFactory>,
    properties: Vec<PropertySpec>,
    groups: Vec<GroupSpec>,
    is_wrapper: bool,
}

impl SettingsSchemaBuilder {
    pub fn new(settings_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            settings_id: settings_id.into(),
            display_name: display_name.into(),
            versions: Vec::new(),
            factory: None,
            properties: Vec::new(),
            groups: Vec::new(),
            is_wrapper: false,
        }
    }

    /// Declare one supported `(tag, revision)` pair; call once per release
    pub fn version(mut self, tag: impl Into<String>, revision: i32) -> Self {
        self.versions.push((tag.into(), revision));
        self
    }

    /// Mark the schema as a thin wrapper around an object registered elsewhere
    pub fn wrapper(mut self) -> Self {
        self.is_wrapper = true;
        self
    }

    /// Supply the factory that produces a default-valued settings object
    pub fn factory<T, F>(mut self, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(move || {
            Box::new(factory()) as Box<dyn Any + Send + Sync>
        }));
        self
    }

    /// Declare display metadata for a group path ahead of property registration
    pub fn group(mut self, path: impl Into<String>, order: i32) -> Self {
        self.groups.push(GroupSpec {
            path: path.into(),
            order,
            display_name_override: None,
        });
        self
    }

    /// Declare a group with a display name differing from its path segment
    pub fn group_named(
        mut self,
        path: impl Into<String>,
        order: i32,
        display_name: impl Into<String>,
    ) -> Self {
        self.groups.push(GroupSpec {
            path: path.into(),
            order,
            display_name_override: Some(display_name.into()),
        });
        self
    }

    /// Register a property with explicit type-erased accessors
    pub fn property(
        mut self,
        descriptor: PropertyDescriptor,
        getter: PropertyGetter,
        setter: PropertySetter,
    ) -> Self {
        self.properties.push(PropertySpec {
            descriptor,
            getter,
            setter,
        });
        self
    }

    /// Register a bool property through plain typed closures
    pub fn bool_property<T, G, S>(self, descriptor: PropertyDescriptor, get: G, set: S) -> Self
    where
        T: Any + Send + Sync,
        G: Fn(&T) -> bool + Send + Sync + 'static,
        S: Fn(&mut T, bool) + Send + Sync + 'static,
    {
        let mut descriptor = descriptor;
        descriptor.kind = SettingsValueKind::Bool;
        let getter: PropertyGetter = Arc::new(move |object| {
            object
                .downcast_ref::<T>()
                .map(|target| SettingsValue::Bool(get(target)))
        });
        let setter: PropertySetter = Arc::new(move |object, value| {
            match (object.downcast_mut::<T>(), value.as_bool()) {
                (Some(target), Some(value)) => {
                    set(target, value);
                    true
                }
                _ => false,
            }
        });
        self.property(descriptor, getter, setter)
    }

    /// Register an integer property through plain typed closures
    pub fn int_property<T, G, S>(self, descriptor: PropertyDescriptor, get: G, set: S) -> Self
    where
        T: Any + Send + Sync,
        G: Fn(&T) -> i64 + Send + Sync + 'static,
        S: Fn(&mut T, i64) + Send + Sync + 'static,
    {
        let mut descriptor = descriptor;
        descriptor.kind = SettingsValueKind::Int;
        let getter: PropertyGetter = Arc::new(move |object| {
            object
                .downcast_ref::<T>()
                .map(|target| SettingsValue::Int(get(target)))
        });
        let setter: PropertySetter = Arc::new(move |object, value| {
            match (object.downcast_mut::<T>(), value.as_int()) {
                (Some(target), Some(value)) => {
                    set(target, value);
                    true
                }
                _ => false,
            }
        });
        self.property(descriptor, getter, setter)
    }

    /// Register a float property through plain typed closures
    pub fn float_property<T, G, S>(self, descriptor: PropertyDescriptor, get: G, set: S) -> Self
    where
        T: Any + Send + Sync,
        G: Fn(&T) -> f64 + Send + Sync + 'static,
        S: Fn(&mut T, f64) + Send + Sync + 'static,
    {
        let mut descriptor = descriptor;
        descriptor.kind = SettingsValueKind::Float;
        let getter: PropertyGetter = Arc::new(move |object| {
            object
                .downcast_ref::<T>()
                .map(|target| SettingsValue::Float(get(target)))
        });
        let setter: PropertySetter = Arc::new(move |object, value| {
            match (object.downcast_mut::<T>(), value.as_float()) {
                (Some(target), Some(value)) => {
                    set(target, value);
                    true
                }
                _ => false,
            }
        });
        self.property(descriptor, getter, setter)
    }

    /// Register a text property through plain typed closures
    pub fn text_property<T, G, S>(self, descriptor: PropertyDescriptor, get: G, set: S) -> Self
    where
        T: Any + Send + Sync,
        G: Fn(&T) -> String + Send + Sync + 'static,
        S: Fn(&mut T, String) + Send + Sync + 'static,
    {
        let mut descriptor = descriptor;
        descriptor.kind = SettingsValueKind::Text;
        let getter: PropertyGetter = Arc::new(move |object| {
            object
                .downcast_ref::<T>()
                .map(|target| SettingsValue::Text(get(target)))
        });
        let setter: PropertySetter = Arc::new(move |object, value| {
            match (object.downcast_mut::<T>(), value.as_text()) {
                (Some(target), Some(value)) => {
                    set(target, value.to_string());
                    true
                }
                _ => false,
            }
        });
        self.property(descriptor, getter, setter)
    }

    pub fn build(self) -> Result<SettingsSchema> {
        let factory = self.factory.ok_or_else(|| {
            ModConfError::ConfigurationError(format!(
                "Settings schema '{}' has no object factory",
                self.settings_id
            ))
        })?;

        for (index, spec) in self.properties.iter().enumerate() {
            let duplicate = self.properties[..index]
                .iter()
                .any(|earlier| earlier.descriptor.id == spec.descriptor.id);
            if duplicate {
                return Err(ModConfError::ConfigurationError(format!(
                    "Settings schema '{}' registers property '{}' twice",
                    self.settings_id, spec.descriptor.id
                ))
                .into());
            }
        }

        Ok(SettingsSchema {
            settings_id: self.settings_id,
            display_name: self.display_name,
            versions: self.versions,
            factory,
            properties: self.properties,
            groups: self.groups,
            is_wrapper: self.is_wrapper,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct CombatSettings {
        friendly_fire: bool,
        damage_multiplier: f64,
        max_enemies: i64,
        battle_cry: String,
    }

    impl Default for CombatSettings {
        fn default() -> Self {
            Self {
                friendly_fire: false,
                damage_multiplier: 1.0,
                max_enemies: 50,
                battle_cry: "Charge!".to_string(),
            }
        }
    }

    fn combat_schema() -> SettingsSchema {
        SettingsSchema::builder("TestMod_Combat", "Test Mod Combat")
            .version("e1.0.0", 1)
            .version("e1.4.0", 3)
            .factory(CombatSettings::default)
            .group("Combat", 1)
            .bool_property(
                PropertyDescriptor::new("friendly_fire", "Friendly Fire", SettingsValueKind::Bool)
                    .with_group("Combat"),
                |settings: &CombatSettings| settings.friendly_fire,
                |settings, value| settings.friendly_fire = value,
            )
            .float_property(
                PropertyDescriptor::new("damage", "Damage Multiplier", SettingsValueKind::Float)
                    .with_group("Combat")
                    .with_hint("Scales all damage dealt"),
                |settings: &CombatSettings| settings.damage_multiplier,
                |settings, value| settings.damage_multiplier = value,
            )
            .int_property(
                PropertyDescriptor::new("max_enemies", "Max Enemies", SettingsValueKind::Int)
                    .with_group("Combat/Advanced")
                    .restart_required(),
                |settings: &CombatSettings| settings.max_enemies,
                |settings, value| settings.max_enemies = value,
            )
            .text_property(
                PropertyDescriptor::new("battle_cry", "Battle Cry", SettingsValueKind::Text),
                |settings: &CombatSettings| settings.battle_cry.clone(),
                |settings, value| settings.battle_cry = value,
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_instantiate_builds_full_tree() {
        let definition = combat_schema().instantiate().unwrap();

        assert_eq!(definition.settings_id(), "TestMod_Combat");
        assert_eq!(definition.version().tag(), "e1.4.0");
        assert_eq!(definition.properties().len(), 4);

        let combat = definition.root().get_group("Combat").unwrap();
        assert_eq!(combat.setting_properties().len(), 2);
        assert!(combat.get_group("Advanced").is_some());

        // property without a group path lands in the default group
        let misc = definition.root().get_group(DEFAULT_GROUP_NAME).unwrap();
        assert_eq!(misc.setting_properties().len(), 1);
    }

    #[test]
    fn test_set_and_get_through_wrapped_tree() {
        let definition = combat_schema().instantiate().unwrap();
        let properties = definition.properties();
        let damage = properties
            .iter()
            .find(|property| property.id() == "damage")
            .unwrap();

        damage.set(SettingsValue::Float(2.5)).unwrap();
        assert_eq!(damage.get().unwrap(), SettingsValue::Float(2.5));
        assert!(definition.changes_made());

        definition.undo_all();
        assert_eq!(damage.get().unwrap(), SettingsValue::Float(1.0));
        assert!(!definition.changes_made());
    }

    #[test]
    fn test_broken_accessor_excluded_from_tree() {
        struct Unrelated;

        let schema = SettingsSchema::builder("TestMod_Broken", "Broken")
            .factory(CombatSettings::default)
            .int_property(
                PropertyDescriptor::new("phantom", "Phantom", SettingsValueKind::Int),
                // downcasts to a type the factory never produces
                |_: &Unrelated| 0,
                |_: &mut Unrelated, _| {},
            )
            .bool_property(
                PropertyDescriptor::new("friendly_fire", "Friendly Fire", SettingsValueKind::Bool),
                |settings: &CombatSettings| settings.friendly_fire,
                |settings, value| settings.friendly_fire = value,
            )
            .build()
            .unwrap();

        let definition = schema.instantiate().unwrap();
        let ids: Vec<String> = definition
            .properties()
            .iter()
            .map(|property| property.id().to_string())
            .collect();
        assert_eq!(ids, ["friendly_fire"]);
    }

    #[test]
    fn test_all_versions_malformed_fails_instantiate() {
        let schema = SettingsSchema::builder("TestMod_BadVersion", "Bad Version")
            .version("not-a-version", 0)
            .factory(CombatSettings::default)
            .build()
            .unwrap();

        assert!(schema.instantiate().is_err());
    }

    #[test]
    fn test_duplicate_property_id_rejected_at_build() {
        let result = SettingsSchema::builder("TestMod_Dup", "Dup")
            .factory(CombatSettings::default)
            .bool_property(
                PropertyDescriptor::new("flag", "Flag", SettingsValueKind::Bool),
                |settings: &CombatSettings| settings.friendly_fire,
                |settings, value| settings.friendly_fire = value,
            )
            .bool_property(
                PropertyDescriptor::new("flag", "Flag Again", SettingsValueKind::Bool),
                |settings: &CombatSettings| settings.friendly_fire,
                |settings, value| settings.friendly_fire = value,
            )
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_missing_factory_rejected_at_build() {
        let result = SettingsSchema::builder("TestMod_NoFactory", "No Factory").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_group_named_overrides_display_name() {
        let schema = SettingsSchema::builder("TestMod_Groups", "Groups")
            .factory(CombatSettings::default)
            .wrapper()
            .group_named("internal", 0, "Shown Name")
            .bool_property(
                PropertyDescriptor::new("flag", "Flag", SettingsValueKind::Bool)
                    .with_group("internal"),
                |settings: &CombatSettings| settings.friendly_fire,
                |settings, value| settings.friendly_fire = value,
            )
            .build()
            .unwrap();

        let definition = schema.instantiate().unwrap();
        assert!(definition.is_wrapper());
        let group = definition.root().get_group("internal").unwrap();
        assert_eq!(group.display_name(), "Shown Name");
    }
}
