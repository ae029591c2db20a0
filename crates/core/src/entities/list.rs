//! Ordered list of items sharing one item schema.

use std::rc::Rc;

use serde_json::Value;

use super::build::{SchemaKind, SchemaNode};
use super::input::json_type_name;
use super::{EntityId, EntityTree, Layer, NodeKind};
use crate::error::SettingsError;
use crate::override_state::OverrideState;

#[derive(Debug, Default)]
pub(crate) struct ListEntity {
    pub(crate) children: Vec<EntityId>,
    pub(crate) default_value: Option<Vec<Value>>,
    pub(crate) studio_value: Option<Vec<Value>>,
    pub(crate) project_value: Option<Vec<Value>>,
    pub(crate) initial_value: Option<Value>,
}

impl EntityTree {
    fn list(&self, id: EntityId) -> &ListEntity {
        match &self.node(id).kind {
            NodeKind::List(list) => list,
            _ => panic!("BUG: entity \"{}\" is not a list", self.path(id)),
        }
    }

    fn list_mut(&mut self, id: EntityId) -> &mut ListEntity {
        match &mut self.node_mut(id).kind {
            NodeKind::List(list) => list,
            _ => panic!("BUG: entity is not a list"),
        }
    }

    fn list_item_schema(&self, id: EntityId) -> Rc<SchemaNode> {
        match &self.node(id).schema.kind {
            SchemaKind::List { item } => Rc::clone(item),
            _ => panic!("BUG: entity \"{}\" has no item schema", self.path(id)),
        }
    }

    pub(super) fn list_update(&mut self, id: EntityId, layer: Layer, value: Option<Value>) {
        let value = self.checked_update(id, layer, value, |value| match value {
            Value::Array(items) => Ok(items),
            other => Err(other),
        });
        self.node_mut(id).flags.set_loaded(layer, value.is_some());
        let list = self.list_mut(id);
        match layer {
            Layer::Default => list.default_value = value,
            Layer::Studio => list.studio_value = value,
            Layer::Project => list.project_value = value,
        }
    }

    pub(super) fn list_apply_state(&mut self, id: EntityId, state: OverrideState) {
        let node = self.node_mut(id);
        node.flags.enter(state);
        let flags = node.flags;

        if state == OverrideState::NotDefined {
            for child in std::mem::take(&mut self.list_mut(id).children) {
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
            self.list_rebuild(id, source);
        }
        let initial = self.settings_value(id);
        self.list_mut(id).initial_value = initial;
    }

    /// Recreate items from the `source` layer. Each item is its own default
    /// and, for override layers, its own override.
    pub(super) fn list_rebuild(&mut self, id: EntityId, source: Layer) {
        for child in std::mem::take(&mut self.list_mut(id).children) {
            self.free_subtree(child);
        }
        let list = self.list(id);
        let items = match source {
            Layer::Default => list.default_value.clone(),
            Layer::Studio => list.studio_value.clone(),
            Layer::Project => list.project_value.clone(),
        }
        .unwrap_or_default();

        let state = self.node(id).state;
        for item in items {
            let child = self.list_create_child(id, None);
            self.update_value(child, Layer::Default, Some(item.clone()));
            if source != Layer::Default {
                self.update_value(child, source, Some(item));
            }
            self.apply_override_state(child, state);
        }
    }

    /// Create an item at `index` (append when `None`) without notifying.
    fn list_create_child(&mut self, id: EntityId, index: Option<usize>) -> EntityId {
        let item = self.list_item_schema(id);
        let child = self.instantiate(&item, Some(id), None, true);
        let children = &mut self.list_mut(id).children;
        match index {
            Some(index) => children.insert(index, child),
            None => children.push(child),
        }
        child
    }

    pub(super) fn list_settings_value(&self, id: EntityId) -> Option<Value> {
        if self.group_without_override(id) {
            return None;
        }
        let items = self
            .list(id)
            .children
            .iter()
            .filter_map(|child| self.settings_value(*child))
            .collect();
        Some(Value::Array(items))
    }

    fn check_index(&self, id: EntityId, index: usize, len: usize) -> Result<(), SettingsError> {
        if index >= len {
            return Err(SettingsError::IndexOutOfRange {
                path: self.path(id),
                index,
                len,
            });
        }
        Ok(())
    }

    /// Create an item at `index` and set `value`; the item is removed again
    /// when the value is refused.
    fn list_insert_silently(&mut self, id: EntityId, index: usize, value: Value) -> Result<EntityId, SettingsError> {
        let state = self.node(id).state;
        let child = self.list_create_child(id, Some(index));
        self.apply_override_state(child, state);
        let result = self.with_ignored_child_changes(id, |tree| tree.set(child, value));
        if let Err(err) = result {
            self.list_mut(id).children.retain(|item| *item != child);
            self.free_subtree(child);
            return Err(err);
        }
        Ok(child)
    }

    // -- Public operations --

    pub fn len(&self, id: EntityId) -> usize {
        self.child_ids(id).len()
    }

    pub fn append(&mut self, id: EntityId, value: Value) -> Result<EntityId, SettingsError> {
        let len = self.list(id).children.len();
        self.insert(id, len, value)
    }

    /// Insert a new item at `index`; `index == len` appends.
    pub fn insert(&mut self, id: EntityId, index: usize, value: Value) -> Result<EntityId, SettingsError> {
        let len = self.list(id).children.len();
        self.check_index(id, index, len + 1)?;
        let child = self.list_insert_silently(id, index, value)?;
        self.on_value_change(id);
        Ok(child)
    }

    /// Append all `values`; nothing is added when one of them is refused.
    pub fn extend(&mut self, id: EntityId, values: Vec<Value>) -> Result<(), SettingsError> {
        let mut added = Vec::with_capacity(values.len());
        for value in values {
            let len = self.list(id).children.len();
            match self.list_insert_silently(id, len, value) {
                Ok(child) => added.push(child),
                Err(err) => {
                    for child in added {
                        self.list_mut(id).children.retain(|item| *item != child);
                        self.free_subtree(child);
                    }
                    return Err(err);
                }
            }
        }
        self.on_value_change(id);
        Ok(())
    }

    /// Remove the first item equal to `value`.
    pub fn remove(&mut self, id: EntityId, value: &Value) -> Result<(), SettingsError> {
        let index = self
            .list(id)
            .children
            .iter()
            .position(|child| self.value(*child) == *value)
            .ok_or_else(|| SettingsError::ValueNotFound {
                path: self.path(id),
                value: value.to_string(),
            })?;
        self.pop(id, index).map(|_| ())
    }

    /// Remove the item at `index` and return its value.
    pub fn pop(&mut self, id: EntityId, index: usize) -> Result<Value, SettingsError> {
        self.check_index(id, index, self.list(id).children.len())?;
        let child = self.list_mut(id).children.remove(index);
        let value = self.value(child);
        self.free_subtree(child);
        self.on_value_change(id);
        Ok(value)
    }

    pub(super) fn list_clear(&mut self, id: EntityId) {
        for child in std::mem::take(&mut self.list_mut(id).children) {
            self.free_subtree(child);
        }
        self.on_value_change(id);
    }

    pub fn swap_indexes(&mut self, id: EntityId, index_1: usize, index_2: usize) -> Result<(), SettingsError> {
        let len = self.list(id).children.len();
        self.check_index(id, index_1, len)?;
        self.check_index(id, index_2, len)?;
        self.list_mut(id).children.swap(index_1, index_2);
        self.on_value_change(id);
        Ok(())
    }

    /// Replace all items. The previous items stay when a value is refused.
    pub(super) fn list_set(&mut self, id: EntityId, value: Value) -> Result<(), SettingsError> {
        let Value::Array(values) = value else {
            return Err(SettingsError::InvalidValueType {
                path: self.path(id),
                expected: "list".to_string(),
                got: json_type_name(&value).to_string(),
            });
        };

        let previous = std::mem::take(&mut self.list_mut(id).children);
        let mut result = Ok(());
        for value in values {
            let len = self.list(id).children.len();
            if let Err(err) = self.list_insert_silently(id, len, value) {
                result = Err(err);
                break;
            }
        }

        let (keep, drop) = match result {
            Ok(()) => (std::mem::take(&mut self.list_mut(id).children), previous),
            Err(_) => (previous, std::mem::take(&mut self.list_mut(id).children)),
        };
        for child in drop {
            self.free_subtree(child);
        }
        self.list_mut(id).children = keep;
        result?;
        self.on_value_change(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn tree() -> (EntityTree, EntityId) {
        let mut tree = EntityTree::from_schema(&json!({"children": [{
            "type": "list",
            "key": "extensions",
            "is_file": true,
            "object_type": {"type": "text"}
        }]}))
        .unwrap();
        let root = tree.root();
        tree.update_default_value(root, Some(json!({"extensions": ["exr", "png"]})));
        tree.update_studio_value(root, Some(json!({})));
        tree.set_override_state(OverrideState::Studio).unwrap();
        let list = tree.entity_by_path("extensions").unwrap();
        (tree, list)
    }

    #[test]
    fn test_items_from_defaults() {
        let (tree, list) = tree();
        assert_eq!(tree.len(list), 2);
        assert_eq!(tree.value(list), json!(["exr", "png"]));
        assert!(!tree.has_studio_override(list));
        assert_eq!(tree.settings_value(list), None);
    }

    #[test]
    fn test_append_marks_override() {
        let (mut tree, list) = tree();
        tree.append(list, json!("jpg")).unwrap();
        assert!(tree.has_studio_override(list));
        assert!(tree.has_unsaved_changes(list));
        assert_eq!(tree.settings_value(list), Some(json!(["exr", "png", "jpg"])));
    }

    #[test]
    fn test_child_change_marks_override() {
        let (mut tree, list) = tree();
        let first = tree.child(list, "0").unwrap();
        tree.set(first, json!("tif")).unwrap();
        assert!(tree.has_studio_override(list));
        assert_eq!(tree.path(first), "extensions/0");
    }

    #[test]
    fn test_insert_pop_swap_remove() {
        let (mut tree, list) = tree();
        tree.insert(list, 0, json!("tga")).unwrap();
        assert_eq!(tree.value(list), json!(["tga", "exr", "png"]));
        tree.swap_indexes(list, 0, 2).unwrap();
        assert_eq!(tree.value(list), json!(["png", "exr", "tga"]));
        assert_eq!(tree.pop(list, 1).unwrap(), json!("exr"));
        tree.remove(list, &json!("png")).unwrap();
        assert_eq!(tree.value(list), json!(["tga"]));
    }

    #[test]
    fn test_out_of_range_and_missing_values() {
        let (mut tree, list) = tree();
        assert_matches!(tree.pop(list, 5), Err(SettingsError::IndexOutOfRange { index: 5, len: 2, .. }));
        assert_matches!(tree.insert(list, 4, json!("x")), Err(SettingsError::IndexOutOfRange { .. }));
        assert_matches!(tree.remove(list, &json!("psd")), Err(SettingsError::ValueNotFound { .. }));
    }

    #[test]
    fn test_refused_values_leave_list_unchanged() {
        let (mut tree, list) = tree();
        assert!(tree.extend(list, vec![json!("jpg"), json!(5)]).is_err());
        assert_eq!(tree.value(list), json!(["exr", "png"]));
        assert!(tree.set(list, json!(["a", false])).is_err());
        assert_eq!(tree.value(list), json!(["exr", "png"]));
        assert!(!tree.has_unsaved_changes(list));

        tree.set(list, json!(["a", "b", "c"])).unwrap();
        assert_eq!(tree.len(list), 3);
    }

    #[test]
    fn test_clear_removes_every_item() {
        let (mut tree, list) = tree();
        let first = tree.child(list, "0").unwrap();
        tree.clear(list).unwrap();
        assert_eq!(tree.value(list), json!([]));
        assert!(!tree.contains(first));
        assert_eq!(tree.settings_value(list), Some(json!([])));
    }

    #[test]
    fn test_discard_restores_items() {
        let (mut tree, list) = tree();
        tree.append(list, json!("jpg")).unwrap();
        tree.discard_changes(list);
        assert_eq!(tree.value(list), json!(["exr", "png"]));
        assert!(!tree.has_unsaved_changes(list));
    }
}
