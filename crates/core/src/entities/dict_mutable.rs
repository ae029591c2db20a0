//! Dict with user defined keys; every value follows one item schema.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::Value;

use super::build::{join_path, SchemaKind, SchemaNode};
use super::check::check_schema_value;
use super::input::json_type_name;
use super::{EntityId, EntityTree, Layer, NodeKind};
use crate::constants::{
    is_metadata_key, KEY_ALLOWED_SYMBOLS, KEY_REGEX, M_DYNAMIC_KEY_LABEL, M_ENVIRONMENT_KEY,
};
use crate::error::SettingsError;
use crate::override_state::OverrideState;
use crate::types::Document;

#[derive(Debug, Default)]
pub(crate) struct DictMutableEntity {
    pub(crate) children: Vec<(String, EntityId)>,
    pub(crate) default_value: Option<Document>,
    pub(crate) studio_value: Option<Document>,
    pub(crate) project_value: Option<Document>,
    pub(crate) default_labels: Document,
    pub(crate) studio_labels: Document,
    pub(crate) project_labels: Document,
    pub(crate) labels: BTreeMap<String, String>,
    pub(crate) initial_value: Option<Value>,
}

struct ItemSchema {
    item: Rc<SchemaNode>,
    value_is_env_group: bool,
    collapsible_key: bool,
    required_keys: Vec<String>,
}

impl EntityTree {
    fn mutable(&self, id: EntityId) -> &DictMutableEntity {
        match &self.node(id).kind {
            NodeKind::DictMutable(dict) => dict,
            _ => panic!("BUG: entity \"{}\" is not a mutable dict", self.path(id)),
        }
    }

    fn mutable_mut(&mut self, id: EntityId) -> &mut DictMutableEntity {
        match &mut self.node_mut(id).kind {
            NodeKind::DictMutable(dict) => dict,
            _ => panic!("BUG: entity is not a mutable dict"),
        }
    }

    fn item_schema(&self, id: EntityId) -> ItemSchema {
        match &self.node(id).schema.kind {
            SchemaKind::DictMutable {
                item,
                value_is_env_group,
                collapsible_key,
                required_keys,
            } => ItemSchema {
                item: Rc::clone(item),
                value_is_env_group: *value_is_env_group,
                collapsible_key: *collapsible_key,
                required_keys: required_keys.clone(),
            },
            _ => panic!("BUG: entity \"{}\" has no item schema", self.path(id)),
        }
    }

    // -- Layers --

    pub(super) fn mutable_update(&mut self, id: EntityId, layer: Layer, value: Option<Value>) {
        let value = self.checked_update(id, layer, value, |value| match value {
            Value::Object(map) => Ok(map),
            other => Err(other),
        });
        self.node_mut(id).flags.set_loaded(layer, value.is_some());

        let (value, labels) = match value {
            None => (None, Document::new()),
            Some(mut map) => {
                let labels = match map.remove(M_DYNAMIC_KEY_LABEL) {
                    Some(Value::Object(labels)) => labels,
                    _ => Document::new(),
                };
                map.retain(|key, _| !is_metadata_key(key));
                (Some(map), labels)
            }
        };

        let dict = self.mutable_mut(id);
        match layer {
            Layer::Default => {
                dict.default_value = value;
                dict.default_labels = labels;
            }
            Layer::Studio => {
                dict.studio_value = value;
                dict.studio_labels = labels;
            }
            Layer::Project => {
                dict.project_value = value;
                dict.project_labels = labels;
            }
        }
    }

    pub(super) fn mutable_apply_state(&mut self, id: EntityId, state: OverrideState) {
        let node = self.node_mut(id);
        node.flags.enter(state);
        let flags = node.flags;

        if state == OverrideState::NotDefined {
            for (_, child) in std::mem::take(&mut self.mutable_mut(id).children) {
                self.free_subtree(child);
            }
        } else {
            let source = if state == OverrideState::Project && flags.has_project_override {
                Layer::Project
            } else if state >= OverrideState::Studio && flags.has_studio_override {
                Layer::Studio
            } else {
                Layer::Default
            };
            self.mutable_rebuild(id, source);
        }
        let initial = self.settings_value(id);
        self.mutable_mut(id).initial_value = initial;
    }

    /// Recreate children from the keys of `source`.
    ///
    /// Each child receives the layers up to `source`, so it resolves the
    /// same way a fixed child would.
    pub(super) fn mutable_rebuild(&mut self, id: EntityId, source: Layer) {
        for (_, child) in std::mem::take(&mut self.mutable_mut(id).children) {
            self.free_subtree(child);
        }

        let dict = self.mutable(id);
        let (value, labels) = match source {
            Layer::Default => (&dict.default_value, &dict.default_labels),
            Layer::Studio => (&dict.studio_value, &dict.studio_labels),
            Layer::Project => (&dict.project_value, &dict.project_labels),
        };
        let value = value.clone().unwrap_or_default();
        let labels: BTreeMap<String, String> = labels
            .iter()
            .filter_map(|(key, label)| Some((key.clone(), label.as_str()?.to_string())))
            .collect();
        let layers: Vec<(Layer, Option<Document>)> = [Layer::Default, Layer::Studio, Layer::Project]
            .into_iter()
            .filter(|layer| match (layer, source) {
                (Layer::Default, _) => true,
                (Layer::Studio, Layer::Default) => false,
                (Layer::Studio, _) => true,
                (Layer::Project, source) => source == Layer::Project,
            })
            .map(|layer| {
                let doc = match layer {
                    Layer::Default => dict.default_value.clone(),
                    Layer::Studio => dict.studio_value.clone(),
                    Layer::Project => dict.project_value.clone(),
                };
                (layer, doc)
            })
            .collect();

        let schema = self.item_schema(id);
        let state = self.node(id).state;
        let mut keys: Vec<String> = value.keys().cloned().collect();
        for required in &schema.required_keys {
            if !keys.contains(required) {
                keys.push(required.clone());
            }
        }

        for key in keys {
            let child = self.mutable_create_child(id, &schema, &key);
            for (layer, doc) in &layers {
                let layer_value = doc.as_ref().and_then(|doc| doc.get(&key)).cloned();
                self.update_value(child, *layer, layer_value);
            }
            self.apply_override_state(child, state);
        }

        let existing: Vec<String> = self.mutable(id).children.iter().map(|(key, _)| key.clone()).collect();
        self.mutable_mut(id).labels = labels
            .into_iter()
            .filter(|(key, _)| existing.contains(key))
            .collect();
    }

    /// Create and register a child under `key` without notifying.
    fn mutable_create_child(&mut self, id: EntityId, schema: &ItemSchema, key: &str) -> EntityId {
        let child = self.instantiate(&schema.item, Some(id), Some(key.to_string()), true);
        if schema.value_is_env_group {
            self.node_mut(child).env_group_key = Some(key.to_string());
        }
        self.mutable_mut(id).children.push((key.to_string(), child));
        child
    }

    pub(super) fn mutable_settings_value(&self, id: EntityId) -> Option<Value> {
        if self.group_without_override(id) {
            return None;
        }
        let dict = self.mutable(id);
        let mut output = Document::new();
        for (key, child) in &dict.children {
            if let Some(value) = self.settings_value(*child) {
                output.insert(key.clone(), value);
            }
        }
        if self.item_schema(id).collapsible_key && !dict.labels.is_empty() {
            let labels: Document = dict
                .labels
                .iter()
                .map(|(key, label)| (key.clone(), Value::String(label.clone())))
                .collect();
            output.insert(M_DYNAMIC_KEY_LABEL.to_string(), Value::Object(labels));
        }
        if let Some(env_key) = &self.node(id).env_group_key {
            let keys: Vec<Value> = dict.children.iter().map(|(key, _)| Value::String(key.clone())).collect();
            let mut groups = Document::new();
            groups.insert(env_key.clone(), Value::Array(keys));
            output.insert(M_ENVIRONMENT_KEY.to_string(), Value::Object(groups));
        }
        Some(Value::Object(output))
    }

    // -- Key validation --

    fn check_new_key(&self, id: EntityId, key: &str) -> Result<(), SettingsError> {
        if !KEY_REGEX.is_match(key) {
            return Err(SettingsError::InvalidKey {
                path: self.path(id),
                key: key.to_string(),
                allowed: KEY_ALLOWED_SYMBOLS,
            });
        }
        if self.child(id, key).is_some() {
            return Err(SettingsError::KeyAlreadyExists {
                path: self.path(id),
                key: key.to_string(),
            });
        }
        Ok(())
    }

    fn check_removable_key(&self, id: EntityId, key: &str) -> Result<EntityId, SettingsError> {
        let child = self.child(id, key).ok_or_else(|| SettingsError::KeyNotFound {
            path: self.path(id),
            key: key.to_string(),
        })?;
        if self.item_schema(id).required_keys.iter().any(|required| required == key) {
            return Err(SettingsError::RequiredKeyModified {
                path: self.path(id),
                key: key.to_string(),
            });
        }
        Ok(child)
    }

    fn remove_child_silently(&mut self, id: EntityId, child: EntityId) {
        let dict = self.mutable_mut(id);
        let Some(position) = dict.children.iter().position(|(_, item)| *item == child) else {
            return;
        };
        let (key, _) = dict.children.remove(position);
        dict.labels.remove(&key);
        self.free_subtree(child);
    }

    // -- Public operations --

    /// Keys of a mutable dict in value order.
    pub fn keys(&self, id: EntityId) -> Vec<String> {
        self.mutable(id).children.iter().map(|(key, _)| key.clone()).collect()
    }

    /// Add `key` with the item schema's unset value.
    pub fn add_key(&mut self, id: EntityId, key: &str) -> Result<EntityId, SettingsError> {
        self.check_new_key(id, key)?;
        let schema = self.item_schema(id);
        let state = self.node(id).state;
        let child = self.mutable_create_child(id, &schema, key);
        self.apply_override_state(child, state);
        self.on_value_change(id);
        Ok(child)
    }

    /// Remove `key` and return its value.
    pub fn pop_key(&mut self, id: EntityId, key: &str) -> Result<Value, SettingsError> {
        let child = self.check_removable_key(id, key)?;
        let value = self.value(child);
        self.remove_child_silently(id, child);
        self.on_value_change(id);
        Ok(value)
    }

    /// Remove every key that is not required.
    pub(super) fn mutable_clear(&mut self, id: EntityId) {
        let required = self.item_schema(id).required_keys;
        let removable: Vec<EntityId> = self
            .mutable(id)
            .children
            .iter()
            .filter(|(key, _)| !required.contains(key))
            .map(|(_, child)| *child)
            .collect();
        for child in removable {
            self.remove_child_silently(id, child);
        }
        self.on_value_change(id);
    }

    /// Set the value of `key`, creating the key when missing.
    pub fn set_value_for_key(&mut self, id: EntityId, key: &str, value: Value) -> Result<(), SettingsError> {
        let (child, created) = match self.child(id, key) {
            Some(child) => (child, false),
            None => {
                self.check_new_key(id, key)?;
                let schema = self.item_schema(id);
                let state = self.node(id).state;
                let child = self.mutable_create_child(id, &schema, key);
                self.apply_override_state(child, state);
                (child, true)
            }
        };

        let result = self.with_ignored_child_changes(id, |tree| tree.set(child, value));
        if result.is_err() && created {
            self.remove_child_silently(id, child);
        }
        result?;
        self.on_value_change(id);
        Ok(())
    }

    /// Rename `old_key` to `new_key` keeping the child.
    pub fn change_key(&mut self, id: EntityId, old_key: &str, new_key: &str) -> Result<(), SettingsError> {
        if old_key == new_key {
            return Ok(());
        }
        let child = self.check_removable_key(id, old_key)?;
        self.check_new_key(id, new_key)?;

        let value_is_env_group = self.item_schema(id).value_is_env_group;
        let dict = self.mutable_mut(id);
        if let Some(entry) = dict.children.iter_mut().find(|(_, item)| *item == child) {
            entry.0 = new_key.to_string();
        }
        if let Some(label) = dict.labels.remove(old_key) {
            dict.labels.insert(new_key.to_string(), label);
        }
        let node = self.node_mut(child);
        node.key = Some(new_key.to_string());
        if value_is_env_group {
            node.env_group_key = Some(new_key.to_string());
        }
        self.on_value_change(id);
        Ok(())
    }

    pub fn key_label(&self, id: EntityId, key: &str) -> Option<&str> {
        self.mutable(id).labels.get(key).map(String::as_str)
    }

    /// Set or remove (`None`) the display label of `key`.
    pub fn set_key_label(&mut self, id: EntityId, key: &str, label: Option<String>) -> Result<(), SettingsError> {
        if self.child(id, key).is_none() {
            return Err(SettingsError::KeyNotFound {
                path: self.path(id),
                key: key.to_string(),
            });
        }
        let labels = &mut self.mutable_mut(id).labels;
        match label {
            Some(label) if !label.is_empty() => {
                labels.insert(key.to_string(), label);
            }
            _ => {
                labels.remove(key);
            }
        }
        self.on_value_change(id);
        Ok(())
    }

    /// Replace the whole content; missing keys are removed. Nothing changes
    /// when a key or a value is refused.
    pub(super) fn mutable_set(&mut self, id: EntityId, value: Value) -> Result<(), SettingsError> {
        let Value::Object(map) = value else {
            return Err(SettingsError::InvalidValueType {
                path: self.path(id),
                expected: "dict".to_string(),
                got: json_type_name(&value).to_string(),
            });
        };
        let map: Document = map.into_iter().filter(|(key, _)| !is_metadata_key(key)).collect();

        for key in map.keys() {
            if self.child(id, key).is_none() {
                self.check_new_key(id, key)?;
            }
        }
        let removed: Vec<String> = self
            .keys(id)
            .into_iter()
            .filter(|key| !map.contains_key(key))
            .collect();
        for key in &removed {
            self.check_removable_key(id, key)?;
        }
        let item_schema = self.item_schema(id).item;
        let path = self.path(id);
        for (key, item) in &map {
            match self.child(id, key) {
                Some(child) => self.check_value(child, item)?,
                None => check_schema_value(&item_schema, &join_path(&path, key), item)?,
            }
        }

        self.with_ignored_child_changes(id, |tree| -> Result<(), SettingsError> {
            for key in &removed {
                if let Some(child) = tree.child(id, key) {
                    tree.remove_child_silently(id, child);
                }
            }
            for (key, item) in map {
                let child = match tree.child(id, &key) {
                    Some(child) => child,
                    None => {
                        let schema = tree.item_schema(id);
                        let state = tree.node(id).state;
                        let child = tree.mutable_create_child(id, &schema, &key);
                        tree.apply_override_state(child, state);
                        child
                    }
                };
                tree.set(child, item)?;
            }
            Ok(())
        })?;
        self.on_value_change(id);
        Ok(())
    }
}
