//! Value checks that run before a container changes any child, so a refused
//! value leaves the tree as it was.

use serde_json::Value;

use super::build::{join_path, SchemaKind, SchemaNode};
use super::input::json_type_name;
use super::{EntityId, EntityTree, NodeKind};
use crate::constants::{is_metadata_key, KEY_ALLOWED_SYMBOLS, KEY_REGEX};
use crate::error::SettingsError;
use crate::types::Document;

fn type_error(path: &str, expected: String, value: &Value) -> SettingsError {
    SettingsError::InvalidValueType {
        path: path.to_string(),
        expected,
        got: json_type_name(value).to_string(),
    }
}

fn expect_object<'a>(path: &str, value: &'a Value) -> Result<&'a Document, SettingsError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(type_error(path, "dict".to_string(), other)),
    }
}

fn value_keys(map: &Document) -> impl Iterator<Item = (&String, &Value)> {
    map.iter().filter(|(key, _)| !is_metadata_key(key))
}

/// Keys of a mutable dict value: new keys must be valid and no required key
/// may be missing.
fn check_mutable_keys<'a>(
    path: &str,
    map: &Document,
    mut new_keys: impl Iterator<Item = &'a String>,
    required_keys: &[String],
) -> Result<(), SettingsError> {
    if let Some(invalid) = new_keys.find(|key| !KEY_REGEX.is_match(key)) {
        return Err(SettingsError::InvalidKey {
            path: path.to_string(),
            key: invalid.clone(),
            allowed: KEY_ALLOWED_SYMBOLS,
        });
    }
    if let Some(missing) = required_keys.iter().find(|key| !map.contains_key(*key)) {
        return Err(SettingsError::RequiredKeyModified {
            path: path.to_string(),
            key: missing.clone(),
        });
    }
    Ok(())
}

/// Check `value` against a schema that has no entities yet.
pub(super) fn check_schema_value(schema: &SchemaNode, path: &str, value: &Value) -> Result<(), SettingsError> {
    match &schema.kind {
        SchemaKind::Input(kind) => kind
            .coerce(value.clone())
            .map(drop)
            .map_err(|issue| issue.into_error(path.to_string())),
        SchemaKind::Dict { children, .. } => {
            for (key, item) in value_keys(expect_object(path, value)?) {
                let child = children
                    .iter()
                    .find(|child| child.key.as_deref() == Some(key.as_str()))
                    .ok_or_else(|| SettingsError::KeyNotFound {
                        path: path.to_string(),
                        key: key.clone(),
                    })?;
                check_schema_value(child, &join_path(path, key), item)?;
            }
            Ok(())
        }
        SchemaKind::DictMutable {
            item, required_keys, ..
        } => {
            let map = expect_object(path, value)?;
            check_mutable_keys(path, map, value_keys(map).map(|(key, _)| key), required_keys)?;
            value_keys(map).try_for_each(|(key, value)| check_schema_value(item, &join_path(path, key), value))
        }
        SchemaKind::List { item } => {
            let Value::Array(values) = value else {
                return Err(type_error(path, "list".to_string(), value));
            };
            values
                .iter()
                .enumerate()
                .try_for_each(|(index, value)| check_schema_value(item, &join_path(path, &index.to_string()), value))
        }
        SchemaKind::ListStrict { items } => match value {
            Value::Array(values) if values.len() == items.len() => items
                .iter()
                .zip(values)
                .enumerate()
                .try_for_each(|(index, (item, value))| {
                    check_schema_value(item, &join_path(path, &index.to_string()), value)
                }),
            other => Err(type_error(path, format!("list of {} items", items.len()), other)),
        },
    }
}

impl EntityTree {
    /// Check that `set(id, value)` would succeed without changing anything.
    ///
    /// Existing children are checked against their entities; values for new
    /// keys or list items are checked against the item schema.
    pub(super) fn check_value(&self, id: EntityId, value: &Value) -> Result<(), SettingsError> {
        let node = self.node(id);
        match &node.kind {
            NodeKind::Input(_) | NodeKind::List(_) => check_schema_value(&node.schema, &self.path(id), value),
            NodeKind::DictFixed(_) => {
                let path = self.path(id);
                for (key, item) in value_keys(expect_object(&path, value)?) {
                    let child = self.child(id, key).ok_or_else(|| SettingsError::KeyNotFound {
                        path: path.clone(),
                        key: key.clone(),
                    })?;
                    self.check_value(child, item)?;
                }
                Ok(())
            }
            NodeKind::DictMutable(_) => {
                let path = self.path(id);
                let map = expect_object(&path, value)?;
                let SchemaKind::DictMutable {
                    item, required_keys, ..
                } = &node.schema.kind
                else {
                    return Ok(());
                };
                let new_keys = value_keys(map)
                    .map(|(key, _)| key)
                    .filter(|key| self.child(id, key).is_none());
                check_mutable_keys(&path, map, new_keys, required_keys)?;
                value_keys(map).try_for_each(|(key, value)| match self.child(id, key) {
                    Some(child) => self.check_value(child, value),
                    None => check_schema_value(item, &join_path(&path, key), value),
                })
            }
            NodeKind::ListStrict(list) => match value {
                Value::Array(values) if values.len() == list.children.len() => list
                    .children
                    .iter()
                    .zip(values)
                    .try_for_each(|(child, value)| self.check_value(*child, value)),
                other => Err(type_error(
                    &self.path(id),
                    format!("list of {} items", list.children.len()),
                    other,
                )),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::override_state::OverrideState;

    fn tree() -> EntityTree {
        let mut tree = EntityTree::from_schema(&json!({"children": [
            {"type": "dict", "key": "render", "is_file": true, "children": [
                {"type": "number", "key": "fps"},
                {"type": "dict-modifiable", "key": "passes", "required_keys": ["beauty"],
                 "object_type": {"type": "list", "object_type": "text"}},
                {"type": "list-strict", "key": "size", "object_types": [{"type": "number"}, {"type": "number"}]}
            ]}
        ]}))
        .unwrap();
        let root = tree.root();
        tree.update_default_value(
            root,
            Some(json!({"render": {"fps": 25, "passes": {"beauty": ["rgba"]}, "size": [1920, 1080]}})),
        );
        tree.set_override_state(OverrideState::Defaults).unwrap();
        tree
    }

    // -- entities --

    #[test]
    fn test_valid_value_passes() {
        let tree = tree();
        let render = tree.entity_by_path("render").unwrap();
        let value = json!({"fps": 24, "passes": {"beauty": [], "depth": ["z"]}, "size": [1280, 720]});
        tree.check_value(render, &value).unwrap();
    }

    #[test]
    fn test_nested_errors_carry_child_path() {
        let tree = tree();
        let render = tree.entity_by_path("render").unwrap();

        let err = tree
            .check_value(render, &json!({"passes": {"beauty": [], "depth": [3]}}))
            .unwrap_err();
        assert_matches!(err, SettingsError::InvalidValueType { ref path, .. } if path == "render/passes/depth/0");

        let err = tree.check_value(render, &json!({"size": [1]})).unwrap_err();
        assert_matches!(err, SettingsError::InvalidValueType { ref path, .. } if path == "render/size");

        let err = tree.check_value(render, &json!({"missing": 1})).unwrap_err();
        assert_matches!(err, SettingsError::KeyNotFound { ref key, .. } if key == "missing");
    }

    #[test]
    fn test_mutable_keys_are_checked() {
        let tree = tree();
        let passes = tree.entity_by_path("render/passes").unwrap();
        assert_matches!(
            tree.check_value(passes, &json!({"depth": []})),
            Err(SettingsError::RequiredKeyModified { ref key, .. }) if key == "beauty"
        );
        assert_matches!(
            tree.check_value(passes, &json!({"beauty": [], "a/b": []})),
            Err(SettingsError::InvalidKey { .. })
        );
    }
}
