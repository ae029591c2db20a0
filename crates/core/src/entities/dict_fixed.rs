//! Dict with keys fixed by the schema.

use std::collections::BTreeSet;

use serde_json::Value;

use super::input::json_type_name;
use super::{EntityId, EntityTree, Layer, NodeKind};
use crate::constants::{is_metadata_key, M_OVERRIDEN_KEY};
use crate::error::SettingsError;
use crate::override_state::OverrideState;
use crate::types::Document;

#[derive(Debug, Default)]
pub(crate) struct DictFixedEntity {
    pub(crate) children: Vec<EntityId>,
    pub(crate) default_metadata: Document,
    pub(crate) studio_metadata: Document,
    pub(crate) project_metadata: Document,
    pub(crate) current_metadata: Document,
    pub(crate) metadata_are_modified: bool,
}

impl DictFixedEntity {
    fn stored_metadata(&self, state: OverrideState) -> &Document {
        match state {
            OverrideState::Studio => &self.studio_metadata,
            OverrideState::Project => &self.project_metadata,
            _ => &self.default_metadata,
        }
    }
}

fn overriden_keys(metadata: &Document) -> BTreeSet<&str> {
    metadata
        .get(M_OVERRIDEN_KEY)
        .and_then(Value::as_array)
        .map(|keys| keys.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

impl EntityTree {
    fn dict(&self, id: EntityId) -> &DictFixedEntity {
        match &self.node(id).kind {
            NodeKind::DictFixed(dict) => dict,
            _ => panic!("BUG: entity \"{}\" is not a dict", self.path(id)),
        }
    }

    fn dict_mut(&mut self, id: EntityId) -> &mut DictFixedEntity {
        match &mut self.node_mut(id).kind {
            NodeKind::DictFixed(dict) => dict,
            _ => panic!("BUG: entity is not a dict"),
        }
    }

    /// Boolean child toggling the dict in the GUI, if the schema names one.
    pub fn checkbox_entity(&self, id: EntityId) -> Option<EntityId> {
        let key = self.node(id).schema.checkbox_key()?;
        self.child(id, key)
    }

    pub(super) fn dict_update(&mut self, id: EntityId, layer: Layer, value: Option<Value>) {
        let value = self.checked_update(id, layer, value, |value| match value {
            Value::Object(map) => Ok(map),
            other => Err(other),
        });
        self.node_mut(id).flags.set_loaded(layer, value.is_some());

        let mut metadata = Document::new();
        if let Some(map) = &value {
            for (key, item) in map {
                if is_metadata_key(key) {
                    metadata.insert(key.clone(), item.clone());
                }
            }
        }
        let dict = self.dict_mut(id);
        match layer {
            Layer::Default => dict.default_metadata = metadata,
            Layer::Studio => dict.studio_metadata = metadata,
            Layer::Project => dict.project_metadata = metadata,
        }

        for child in dict.children.clone() {
            let child_value = match (&value, self.node(child).key.as_deref()) {
                (Some(map), Some(key)) => map.get(key).cloned(),
                _ => None,
            };
            self.update_value(child, layer, child_value);
        }
    }

    pub(super) fn dict_apply_state(&mut self, id: EntityId, state: OverrideState) {
        self.node_mut(id).flags.enter(state);
        for child in self.dict(id).children.clone() {
            self.apply_override_state(child, state);
        }
        self.dict_update_current_metadata(id);
    }

    /// Recompute the list of overridden group children.
    pub(super) fn dict_update_current_metadata(&mut self, id: EntityId) {
        let state = self.node(id).state;
        let dict = self.dict(id);

        let mut metadata = Document::new();
        if state >= OverrideState::Studio {
            let groups: Vec<Value> = dict
                .children
                .iter()
                .filter(|child| self.node(**child).is_group && self.is_overridden(**child))
                .filter_map(|child| self.node(*child).key.clone())
                .map(Value::String)
                .collect();
            if !groups.is_empty() {
                metadata.insert(M_OVERRIDEN_KEY.to_string(), Value::Array(groups));
            }
        }
        let modified = overriden_keys(&metadata) != overriden_keys(dict.stored_metadata(state));

        let dict = self.dict_mut(id);
        dict.current_metadata = metadata;
        dict.metadata_are_modified = modified;
    }

    pub(super) fn dict_has_unsaved_changes(&self, id: EntityId) -> bool {
        if self.node(id).state == OverrideState::NotDefined {
            return false;
        }
        let dict = self.dict(id);
        dict.metadata_are_modified
            || dict
                .children
                .iter()
                .any(|child| self.has_unsaved_changes(*child))
    }

    pub(super) fn dict_settings_value(&self, id: EntityId) -> Option<Value> {
        let node = self.node(id);
        let dict = self.dict(id);

        if node.state == OverrideState::Defaults {
            // Children outside of any file are flattened to `key/subkey` so
            // the caller can map them to file paths.
            let mut output = Document::new();
            for child in &dict.children {
                let child_node = self.node(*child);
                let key = child_node.key.clone().unwrap_or_default();
                let Some(value) = self.settings_value(*child) else {
                    continue;
                };
                match value {
                    Value::Object(map) if !child_node.schema.is_file && child_node.file_item.is_none() => {
                        for (sub_key, sub_value) in map {
                            output.insert(format!("{key}/{sub_key}"), sub_value);
                        }
                    }
                    value => {
                        output.insert(key, value);
                    }
                }
            }
            return Some(Value::Object(output));
        }

        if self.group_without_override(id) {
            return None;
        }
        let mut output = Document::new();
        for child in &dict.children {
            if let (Some(key), Some(value)) = (&self.node(*child).key, self.settings_value(*child)) {
                output.insert(key.clone(), value);
            }
        }
        if output.is_empty() && node.parent.is_some() {
            return None;
        }
        output.extend(dict.current_metadata.clone());
        Some(Value::Object(output))
    }

    /// Set values of the listed children; other children keep their values.
    /// Nothing changes when any of the values is refused.
    pub(super) fn dict_set(&mut self, id: EntityId, value: Value) -> Result<(), SettingsError> {
        let Value::Object(map) = value else {
            return Err(SettingsError::InvalidValueType {
                path: self.path(id),
                expected: "dict".to_string(),
                got: json_type_name(&value).to_string(),
            });
        };

        let mut targets = Vec::with_capacity(map.len());
        for (key, item) in map {
            if is_metadata_key(&key) {
                continue;
            }
            let child = self.child(id, &key).ok_or_else(|| SettingsError::KeyNotFound {
                path: self.path(id),
                key: key.clone(),
            })?;
            targets.push((child, item));
        }
        for (child, item) in &targets {
            self.check_value(*child, item)?;
        }

        self.with_ignored_child_changes(id, |tree| {
            targets
                .into_iter()
                .try_for_each(|(child, item)| tree.set(child, item))
        })?;
        self.on_change(id);
        Ok(())
    }
}
