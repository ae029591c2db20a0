//! Leaf entities holding a single JSON value.

use serde_json::Value;

use super::{EntityId, EntityTree, EntityType, Layer, NodeKind, OverrideFlags};
use crate::constants::{is_metadata_key, M_ENVIRONMENT_KEY};
use crate::error::SettingsError;
use crate::override_state::OverrideState;
use crate::types::Document;

/// 2^63; integral floats in `-I64_BOUND..I64_BOUND` fit an `i64`.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Value type of an input entity.
#[derive(Debug, Clone, PartialEq)]
pub enum InputKind {
    Boolean,
    /// `decimal == 0` accepts integers only.
    Number { decimal: u32 },
    Text,
    /// Items are `(value, label)` pairs in schema order.
    Enum {
        items: Vec<(String, String)>,
        multiselection: bool,
    },
    PathInput { with_arguments: bool },
    /// Free-form object or list, optionally an environment group.
    RawJson,
}

/// Why a value was refused by [`InputKind::coerce`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ValueIssue {
    Type {
        expected: &'static str,
        got: &'static str,
    },
    EnumItem {
        item: String,
        valid: Vec<String>,
    },
}

impl ValueIssue {
    pub(crate) fn into_error(self, path: String) -> SettingsError {
        match self {
            ValueIssue::Type { expected, got } => SettingsError::InvalidValueType {
                path,
                expected: expected.to_string(),
                got: got.to_string(),
            },
            ValueIssue::EnumItem { item, valid } => SettingsError::InvalidEnumItem { path, item, valid },
        }
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

impl InputKind {
    pub fn entity_type(&self) -> EntityType {
        match self {
            InputKind::Boolean => EntityType::Boolean,
            InputKind::Number { .. } => EntityType::Number,
            InputKind::Text => EntityType::Text,
            InputKind::Enum { .. } => EntityType::Enum,
            InputKind::PathInput { .. } => EntityType::PathInput,
            InputKind::RawJson => EntityType::RawJson,
        }
    }

    /// Value used when no layer provides one.
    pub fn value_on_not_set(&self) -> Value {
        match self {
            InputKind::Boolean => Value::Bool(true),
            InputKind::Number { .. } => Value::from(0),
            InputKind::Text => Value::String(String::new()),
            InputKind::Enum {
                multiselection: true,
                ..
            } => Value::Array(Vec::new()),
            InputKind::Enum { items, .. } => items
                .first()
                .map(|(key, _)| Value::String(key.clone()))
                .unwrap_or(Value::Null),
            InputKind::PathInput {
                with_arguments: true,
            } => serde_json::json!(["", ""]),
            InputKind::PathInput { .. } => Value::String(String::new()),
            InputKind::RawJson => Value::Object(Document::new()),
        }
    }

    /// Check `value` against the kind and normalize it.
    ///
    /// Integral floats are converted for integer numbers; raw JSON objects
    /// lose their metadata keys.
    pub(crate) fn coerce(&self, value: Value) -> Result<Value, ValueIssue> {
        let mismatch = |expected: &'static str, value: &Value| ValueIssue::Type {
            expected,
            got: json_type_name(value),
        };

        match self {
            InputKind::Boolean => match value {
                Value::Bool(_) => Ok(value),
                other => Err(mismatch("bool", &other)),
            },
            InputKind::Number { decimal } => {
                let Value::Number(number) = &value else {
                    return Err(mismatch("int, float", &value));
                };
                if *decimal > 0 || number.is_i64() || number.is_u64() {
                    return Ok(value);
                }
                let float = number.as_f64().unwrap_or(f64::NAN);
                let in_range = (-I64_BOUND..I64_BOUND).contains(&float);
                if in_range && float.fract() == 0.0 {
                    tracing::debug!(value = float, "Converting integral float to integer");
                    Ok(Value::from(float as i64))
                } else {
                    Err(mismatch("int", &value))
                }
            }
            InputKind::Text => match value {
                Value::String(_) => Ok(value),
                other => Err(mismatch("str", &other)),
            },
            InputKind::Enum {
                items,
                multiselection,
            } => {
                let check = |item: &Value| -> Result<(), ValueIssue> {
                    let Value::String(item) = item else {
                        return Err(mismatch("str", item));
                    };
                    if items.iter().any(|(key, _)| key == item) {
                        Ok(())
                    } else {
                        Err(ValueIssue::EnumItem {
                            item: item.clone(),
                            valid: items.iter().map(|(key, _)| key.clone()).collect(),
                        })
                    }
                };
                if *multiselection {
                    let Value::Array(selected) = &value else {
                        return Err(mismatch("list", &value));
                    };
                    selected.iter().try_for_each(check)?;
                } else {
                    check(&value)?;
                }
                Ok(value)
            }
            InputKind::PathInput { with_arguments } => {
                if !with_arguments {
                    return match value {
                        Value::String(_) => Ok(value),
                        other => Err(mismatch("str", &other)),
                    };
                }
                match &value {
                    Value::Array(parts) if parts.len() == 2 && parts.iter().all(Value::is_string) => {
                        Ok(value)
                    }
                    other => Err(mismatch("list of two str", other)),
                }
            }
            InputKind::RawJson => match value {
                Value::Object(map) => Ok(Value::Object(
                    map.into_iter()
                        .filter(|(key, _)| !is_metadata_key(key))
                        .collect(),
                )),
                Value::Array(_) => Ok(value),
                other => Err(mismatch("dict, list", &other)),
            },
        }
    }
}

/// Split top level metadata keys from a stored object value.
fn split_metadata(value: Value) -> (Value, Document) {
    let Value::Object(map) = value else {
        return (value, Document::new());
    };
    let mut metadata = Document::new();
    let mut data = Document::new();
    for (key, item) in map {
        if is_metadata_key(&key) {
            metadata.insert(key, item);
        } else {
            data.insert(key, item);
        }
    }
    (Value::Object(data), metadata)
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub(crate) struct InputEntity {
    pub(crate) kind: InputKind,
    pub(crate) default_value: Option<Value>,
    pub(crate) studio_value: Option<Value>,
    pub(crate) project_value: Option<Value>,
    pub(crate) default_metadata: Document,
    pub(crate) studio_metadata: Document,
    pub(crate) project_metadata: Document,
    pub(crate) current: Value,
    pub(crate) value_is_modified: bool,
}

impl InputEntity {
    pub(crate) fn new(kind: InputKind) -> Self {
        let current = kind.value_on_not_set();
        Self {
            kind,
            default_value: None,
            studio_value: None,
            project_value: None,
            default_metadata: Document::new(),
            studio_metadata: Document::new(),
            project_metadata: Document::new(),
            current,
            value_is_modified: false,
        }
    }

    /// Stored value `state` resolves to, with the metadata of its layer.
    fn resolved(&self, state: OverrideState, flags: OverrideFlags) -> Option<(&Value, &Document)> {
        if state == OverrideState::Project && flags.has_project_override {
            if let Some(value) = &self.project_value {
                return Some((value, &self.project_metadata));
            }
        }
        if state >= OverrideState::Studio && flags.has_studio_override {
            if let Some(value) = &self.studio_value {
                return Some((value, &self.studio_metadata));
            }
        }
        if state >= OverrideState::Defaults {
            return self.default_value.as_ref().map(|value| (value, &self.default_metadata));
        }
        None
    }

    fn reselect(&mut self, state: OverrideState, flags: OverrideFlags) {
        self.current = match self.resolved(state, flags) {
            Some((value, _)) => value.clone(),
            None => self.kind.value_on_not_set(),
        };
    }
}

impl EntityTree {
    fn input(&self, id: EntityId) -> &InputEntity {
        match &self.node(id).kind {
            NodeKind::Input(input) => input,
            _ => panic!("BUG: entity \"{}\" is not an input", self.path(id)),
        }
    }

    fn input_mut(&mut self, id: EntityId) -> &mut InputEntity {
        match &mut self.node_mut(id).kind {
            NodeKind::Input(input) => input,
            _ => panic!("BUG: entity is not an input"),
        }
    }

    pub(super) fn input_update(&mut self, id: EntityId, layer: Layer, value: Option<Value>) {
        let (value, metadata) = match value {
            None => (None, Document::new()),
            Some(value) => {
                let (value, metadata) = split_metadata(value);
                match self.input(id).kind.coerce(value) {
                    Ok(value) => (Some(value), metadata),
                    Err(issue) => {
                        let err = issue.into_error(self.path(id));
                        tracing::warn!(layer = ?layer, error = %err, "Ignoring invalid stored value");
                        (None, Document::new())
                    }
                }
            }
        };

        self.node_mut(id).flags.set_loaded(layer, value.is_some());
        let input = self.input_mut(id);
        match layer {
            Layer::Default => {
                input.default_value = value;
                input.default_metadata = metadata;
            }
            Layer::Studio => {
                input.studio_value = value;
                input.studio_metadata = metadata;
            }
            Layer::Project => {
                input.project_value = value;
                input.project_metadata = metadata;
            }
        }
    }

    pub(super) fn input_apply_state(&mut self, id: EntityId, state: OverrideState) {
        let node = self.node_mut(id);
        node.flags.enter(state);
        let flags = node.flags;
        self.input_mut(id).reselect(state, flags);
        self.input_refresh(id);
    }

    pub(super) fn input_set(&mut self, id: EntityId, value: Value) -> Result<(), SettingsError> {
        let value = self
            .input(id)
            .kind
            .coerce(value)
            .map_err(|issue| issue.into_error(self.path(id)))?;

        let node = self.node_mut(id);
        let state = node.state;
        node.flags.mark(state);
        self.input_mut(id).current = value;
        self.on_change(id);
        Ok(())
    }

    pub(super) fn input_refresh(&mut self, id: EntityId) {
        let node = self.node(id);
        let input = self.input(id);
        let modified = match input.resolved(node.state, node.flags) {
            Some((value, _)) => *value != input.current,
            None => node.state != OverrideState::NotDefined,
        };
        self.input_mut(id).value_is_modified = modified;
    }

    /// Environment group metadata of the current value.
    fn input_env_metadata(&self, id: EntityId) -> Document {
        let mut metadata = Document::new();
        let (Some(env_key), Value::Object(value)) =
            (&self.node(id).env_group_key, &self.input(id).current)
        else {
            return metadata;
        };
        let keys: Vec<Value> = value.keys().cloned().map(Value::String).collect();
        let mut groups = Document::new();
        groups.insert(env_key.clone(), Value::Array(keys));
        metadata.insert(M_ENVIRONMENT_KEY.to_string(), Value::Object(groups));
        metadata
    }

    pub(super) fn input_has_unsaved_changes(&self, id: EntityId) -> bool {
        let node = self.node(id);
        if node.state == OverrideState::NotDefined {
            return false;
        }
        let input = self.input(id);
        if input.value_is_modified || node.flags.unsaved(node.state) {
            return true;
        }
        if node.env_group_key.is_some() {
            let stored = input
                .resolved(node.state, node.flags)
                .map(|(_, metadata)| metadata.clone())
                .unwrap_or_default();
            return stored != self.input_env_metadata(id);
        }
        false
    }

    pub(super) fn input_settings_value(&self, id: EntityId) -> Option<Value> {
        if self.group_without_override(id) {
            return None;
        }
        let mut value = self.input(id).current.clone();
        if let Value::Object(map) = &mut value {
            map.extend(self.input_env_metadata(id));
        }
        Some(value)
    }

    // -- Actions --

    pub(super) fn input_discard(&mut self, id: EntityId) {
        let node = self.node_mut(id);
        node.flags.restore();
        let (state, flags) = (node.state, node.flags);
        self.input_mut(id).reselect(state, flags);
    }

    pub(super) fn input_reset_to_default(&mut self, id: EntityId) {
        let node = self.node_mut(id);
        node.flags.has_studio_override = false;
        let (state, flags) = (node.state, node.flags);
        self.input_mut(id).reselect(state, flags);
    }

    pub(super) fn input_remove_overrides(&mut self, id: EntityId) {
        let node = self.node_mut(id);
        node.flags.has_project_override = false;
        let (state, flags) = (node.state, node.flags);
        self.input_mut(id).reselect(state, flags);
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn enum_kind(multiselection: bool) -> InputKind {
        InputKind::Enum {
            items: vec![
                ("a".to_string(), "A".to_string()),
                ("b".to_string(), "B".to_string()),
            ],
            multiselection,
        }
    }

    // -- coerce --

    #[test]
    fn test_integer_number_converts_integral_float() {
        let kind = InputKind::Number { decimal: 0 };
        assert_eq!(kind.coerce(json!(2.0)).unwrap(), json!(2));
        assert_eq!(kind.coerce(json!(7)).unwrap(), json!(7));
        assert_matches!(kind.coerce(json!(2.5)), Err(ValueIssue::Type { expected: "int", .. }));
    }

    #[test]
    fn test_integer_number_rejects_float_out_of_range() {
        let kind = InputKind::Number { decimal: 0 };
        assert_matches!(kind.coerce(json!(1e20)), Err(ValueIssue::Type { expected: "int", .. }));
        assert_matches!(kind.coerce(json!(-1e19)), Err(ValueIssue::Type { expected: "int", .. }));
        assert_eq!(kind.coerce(json!(-9.0e18)).unwrap(), json!(-9_000_000_000_000_000_000_i64));
    }

    #[test]
    fn test_decimal_number_keeps_float() {
        let kind = InputKind::Number { decimal: 2 };
        assert_eq!(kind.coerce(json!(2.5)).unwrap(), json!(2.5));
        assert_matches!(kind.coerce(json!("2")), Err(ValueIssue::Type { got: "str", .. }));
    }

    #[test]
    fn test_enum_items_are_checked() {
        assert_eq!(enum_kind(false).coerce(json!("b")).unwrap(), json!("b"));
        assert_matches!(
            enum_kind(false).coerce(json!("c")),
            Err(ValueIssue::EnumItem { ref item, .. }) if item == "c"
        );
        assert_eq!(enum_kind(true).coerce(json!(["a", "b"])).unwrap(), json!(["a", "b"]));
        assert_matches!(enum_kind(true).coerce(json!("a")), Err(ValueIssue::Type { .. }));
    }

    #[test]
    fn test_path_input_with_arguments() {
        let kind = InputKind::PathInput {
            with_arguments: true,
        };
        assert!(kind.coerce(json!(["/bin/maya", "-batch"])).is_ok());
        assert!(kind.coerce(json!(["/bin/maya"])).is_err());
        assert!(kind.coerce(json!("/bin/maya")).is_err());
    }

    #[test]
    fn test_raw_json_strips_metadata() {
        let value = InputKind::RawJson
            .coerce(json!({"PATH": "/bin", "__environment_keys__": {"maya": ["PATH"]}}))
            .unwrap();
        assert_eq!(value, json!({"PATH": "/bin"}));
        assert!(InputKind::RawJson.coerce(json!("text")).is_err());
    }

    // -- defaults --

    #[test]
    fn test_value_on_not_set() {
        assert_eq!(InputKind::Boolean.value_on_not_set(), json!(true));
        assert_eq!(enum_kind(false).value_on_not_set(), json!("a"));
        assert_eq!(enum_kind(true).value_on_not_set(), json!([]));
        assert_eq!(
            InputKind::PathInput {
                with_arguments: true
            }
            .value_on_not_set(),
            json!(["", ""])
        );
        assert_eq!(InputKind::RawJson.value_on_not_set(), json!({}));
    }

    #[test]
    fn test_split_metadata() {
        let (value, metadata) = split_metadata(json!({"A": 1, "__environment_keys__": {"g": ["A"]}}));
        assert_eq!(value, json!({"A": 1}));
        assert!(metadata.contains_key(M_ENVIRONMENT_KEY));
    }
}
