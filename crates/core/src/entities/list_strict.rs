//! List with a fixed number of items, each with its own schema.

use serde_json::Value;

use super::input::json_type_name;
use super::{EntityId, EntityTree, Layer, NodeKind};
use crate::error::SettingsError;
use crate::override_state::OverrideState;

#[derive(Debug, Default)]
pub(crate) struct ListStrictEntity {
    pub(crate) children: Vec<EntityId>,
    pub(crate) initial_value: Option<Value>,
}

impl EntityTree {
    fn strict_children(&self, id: EntityId) -> &[EntityId] {
        match &self.node(id).kind {
            NodeKind::ListStrict(list) => &list.children,
            _ => panic!("BUG: entity \"{}\" is not a strict list", self.path(id)),
        }
    }

    fn strict_mut(&mut self, id: EntityId) -> &mut ListStrictEntity {
        match &mut self.node_mut(id).kind {
            NodeKind::ListStrict(list) => list,
            _ => panic!("BUG: entity is not a strict list"),
        }
    }

    pub(super) fn strict_update(&mut self, id: EntityId, layer: Layer, value: Option<Value>) {
        let value = self.checked_update(id, layer, value, |value| match value {
            Value::Array(items) => Ok(items),
            other => Err(other),
        });
        self.node_mut(id).flags.set_loaded(layer, value.is_some());

        let children = self.strict_children(id).to_vec();
        if let Some(items) = &value {
            if items.len() != children.len() {
                tracing::warn!(
                    path = %self.path(id),
                    layer = ?layer,
                    expected = children.len(),
                    got = items.len(),
                    "Stored value has unexpected length",
                );
            }
        }
        for (index, child) in children.into_iter().enumerate() {
            let item = value.as_ref().and_then(|items| items.get(index)).cloned();
            self.update_value(child, layer, item);
        }
    }

    pub(super) fn strict_apply_state(&mut self, id: EntityId, state: OverrideState) {
        self.node_mut(id).flags.enter(state);
        for child in self.strict_children(id).to_vec() {
            self.apply_override_state(child, state);
        }
        let initial = self.settings_value(id);
        self.strict_mut(id).initial_value = initial;
    }

    /// Take the override flag of the active layer from the items.
    pub(super) fn strict_sync_flags(&mut self, id: EntityId) {
        let children = self.strict_children(id).to_vec();
        match self.node(id).state {
            OverrideState::Studio => {
                let has = children.iter().any(|child| self.has_studio_override(*child));
                self.node_mut(id).flags.has_studio_override = has;
            }
            OverrideState::Project => {
                let has = children.iter().any(|child| self.has_project_override(*child));
                self.node_mut(id).flags.has_project_override = has;
            }
            _ => {}
        }
    }

    pub(super) fn strict_settings_value(&self, id: EntityId) -> Option<Value> {
        if self.group_without_override(id) {
            return None;
        }
        let items = self
            .strict_children(id)
            .iter()
            .map(|child| self.settings_value(*child).unwrap_or(Value::Null))
            .collect();
        Some(Value::Array(items))
    }

    pub(super) fn strict_set(&mut self, id: EntityId, value: Value) -> Result<(), SettingsError> {
        let children = self.strict_children(id).to_vec();
        let values = match value {
            Value::Array(values) if values.len() == children.len() => values,
            other => {
                return Err(SettingsError::InvalidValueType {
                    path: self.path(id),
                    expected: format!("list of {} items", children.len()),
                    got: json_type_name(&other).to_string(),
                })
            }
        };

        for (child, item) in children.iter().zip(&values) {
            self.check_value(*child, item)?;
        }

        self.with_ignored_child_changes(id, |tree| {
            children
                .into_iter()
                .zip(values)
                .try_for_each(|(child, item)| tree.set(child, item))
        })?;
        self.strict_sync_flags(id);
        self.on_change(id);
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
            "type": "dict", "key": "render", "is_file": true, "children": [{
                "type": "list-strict",
                "key": "resolution",
                "object_types": [
                    {"type": "number"},
                    {"type": "number"}
                ]
            }]
        }]}))
        .unwrap();
        let root = tree.root();
        tree.update_default_value(root, Some(json!({"render": {"resolution": [1920, 1080]}})));
        tree.update_studio_value(root, Some(json!({})));
        tree.set_override_state(OverrideState::Studio).unwrap();
        let list = tree.entity_by_path("render/resolution").unwrap();
        (tree, list)
    }

    #[test]
    fn test_items_follow_schema() {
        let (tree, list) = tree();
        assert_eq!(tree.value(list), json!([1920, 1080]));
        assert!(tree.is_group(list));
        assert!(!tree.is_group(tree.child(list, "1").unwrap()));
    }

    #[test]
    fn test_item_change_marks_list() {
        let (mut tree, list) = tree();
        let height = tree.child(list, "1").unwrap();
        tree.set(height, json!(1440)).unwrap();
        assert!(tree.has_studio_override(list));
        assert_eq!(tree.settings_value(list), Some(json!([1920, 1440])));

        tree.reset_to_pype_default(list);
        assert!(!tree.has_studio_override(list));
        assert_eq!(tree.value(list), json!([1920, 1080]));
    }

    #[test]
    fn test_set_requires_exact_length() {
        let (mut tree, list) = tree();
        assert!(tree.set(list, json!([1])).is_err());
        tree.set(list, json!([2048, 858])).unwrap();
        assert_eq!(tree.value(list), json!([2048, 858]));
        assert!(tree.has_unsaved_changes(list));
    }

    #[test]
    fn test_refused_item_keeps_previous_items() {
        let (mut tree, list) = tree();
        let calls = std::rc::Rc::new(std::cell::Cell::new(0));
        let counter = calls.clone();
        tree.register_on_change(move || counter.set(counter.get() + 1));

        let err = tree.set(list, json!([2048, "tall"])).unwrap_err();
        assert_matches!(err, SettingsError::InvalidValueType { ref path, .. } if path == "render/resolution/1");
        assert_eq!(tree.value(list), json!([1920, 1080]));
        assert!(!tree.has_studio_override(list));
        assert!(!tree.has_unsaved_changes(list));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_short_stored_value_is_padded() {
        let (mut tree, list) = tree();
        let root = tree.root();
        tree.update_default_value(root, Some(json!({"render": {"resolution": [640]}})));
        tree.set_override_state_with(OverrideState::Defaults, true).unwrap();
        assert_eq!(tree.value(list), json!([640, 0]));
        assert!(tree.has_unsaved_changes(list));
    }
}
