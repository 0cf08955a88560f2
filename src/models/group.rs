//! Property group trees
//!
//! Groups organize a flat set of discovered properties into a display
//! hierarchy. Listings are sorted on read, so insertion order never matters and
//! repeated reads are stable.

use crate::models::property::PropertyDefinition;
use crate::models::sort::natural_cmp;
use std::sync::Arc;

/// Group used for properties registered without an explicit group path
pub const DEFAULT_GROUP_NAME: &str = "Misc";

/// A named, orderable tree node holding child groups and properties
#[derive(Debug, Default)]
pub struct PropertyGroupDefinition {
    name: String,
    display_name_override: Option<String>,
    order: i32,
    sub_groups: Vec<PropertyGroupDefinition>,
    properties: Vec<Arc<PropertyDefinition>>,
}

impl PropertyGroupDefinition {
    pub fn new(name: impl Into<String>, order: i32) -> Self {
        Self {
            name: name.into(),
            display_name_override: None,
            order,
            sub_groups: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// An unnamed root node for a definition tree
    pub fn root() -> Self {
        Self::new("", 0)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The override when one was supplied, the plain name otherwise
    pub fn display_name(&self) -> &str {
        self.display_name_override.as_deref().unwrap_or(&self.name)
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn set_order(&mut self, order: i32) {
        self.order = order;
    }

    pub fn set_display_name_override(&mut self, display_name: impl Into<String>) {
        self.display_name_override = Some(display_name.into());
    }

    pub fn add_property(&mut self, property: Arc<PropertyDefinition>) {
        self.properties.push(property);
    }

    pub fn add_sub_group(&mut self, group: PropertyGroupDefinition) {
        self.sub_groups.push(group);
    }

    /// Single-level exact lookup among direct children; first match wins
    pub fn get_group(&self, name: &str) -> Option<&PropertyGroupDefinition> {
        self.sub_groups.iter().find(|group| group.name == name)
    }

    /// Resolve or lazily create the group at a slash-separated path like
    /// `"Combat/Advanced"`, creating intermediate groups as needed.
    pub fn get_group_for(&mut self, path: &str) -> &mut PropertyGroupDefinition {
        let mut current = self;
        for part in path.split('/').filter(|part| !part.trim().is_empty()) {
            let node = current;
            let index = match node.sub_groups.iter().position(|group| group.name == part) {
                Some(index) => index,
                None => {
                    node.sub_groups.push(PropertyGroupDefinition::new(part, -1));
                    node.sub_groups.len() - 1
                }
            };
            current = &mut node.sub_groups[index];
        }
        current
    }

    /// Child groups in display order: explicit order first, then
    /// alphanumeric-natural by display name. Computed on read.
    pub fn sub_groups(&self) -> Vec<&PropertyGroupDefinition> {
        let mut groups: Vec<&PropertyGroupDefinition> = self.sub_groups.iter().collect();
        groups.sort_by(|a, b| {
            a.order
                .cmp(&b.order)
                .then_with(|| natural_cmp(a.display_name(), b.display_name()))
        });
        groups
    }

    /// Child properties in display order, computed on read
    pub fn setting_properties(&self) -> Vec<Arc<PropertyDefinition>> {
        let mut properties = self.properties.clone();
        properties.sort_by(|a, b| {
            a.order()
                .cmp(&b.order())
                .then_with(|| natural_cmp(a.display_name(), b.display_name()))
        });
        properties
    }

    /// Depth-first walk over every property in the tree
    pub(crate) fn collect_properties(&self, out: &mut Vec<Arc<PropertyDefinition>>) {
        out.extend(self.properties.iter().cloned());
        for group in &self.sub_groups {
            group.collect_properties(out);
        }
    }
}
