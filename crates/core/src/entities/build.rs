//! Schema parsing and entity construction.
//!
//! A resolved schema is parsed once into a tree of [`SchemaNode`]s. All
//! per-item checks happen while parsing, the checks needing parent context
//! (groups, files, environment groups) run on the built entity tree. Item
//! schemas of mutable dicts and lists are shared through `Rc` so dynamic
//! children are created without revisiting the schema.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use serde_json::Value;

use super::dict_fixed::DictFixedEntity;
use super::dict_mutable::DictMutableEntity;
use super::input::{InputEntity, InputKind};
use super::list::ListEntity;
use super::list_strict::ListStrictEntity;
use super::{EntityId, EntityTree, Node, NodeKind, OverrideFlags};
use crate::constants::{KEY_REGEX, PATH_PLATFORMS};
use crate::error::SettingsError;
use crate::override_state::OverrideState;
use crate::schema::SchemaType;
use crate::types::Document;

/// Item of a dict GUI layout.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutItem {
    /// Child entity with the given key.
    Entity(String),
    /// Label, separator or another item without a value.
    Gui(Document),
    /// Layout wrapper; its children belong to the enclosing dict.
    Wrapper {
        schema: Document,
        children: Vec<LayoutItem>,
    },
}

#[derive(Debug)]
pub(crate) struct SchemaNode {
    pub(crate) data: Document,
    pub(crate) key: Option<String>,
    pub(crate) label: Option<String>,
    pub(crate) is_group: bool,
    pub(crate) is_file: bool,
    /// Becomes a group when no ancestor is one.
    pub(crate) auto_group: bool,
    pub(crate) env_group_key: Option<String>,
    pub(crate) kind: SchemaKind,
}

#[derive(Debug)]
pub(crate) enum SchemaKind {
    Input(InputKind),
    Dict {
        children: Vec<Rc<SchemaNode>>,
        layout: Vec<LayoutItem>,
        checkbox_key: Option<String>,
    },
    DictMutable {
        item: Rc<SchemaNode>,
        value_is_env_group: bool,
        collapsible_key: bool,
        required_keys: Vec<String>,
    },
    List {
        item: Rc<SchemaNode>,
    },
    ListStrict {
        items: Vec<Rc<SchemaNode>>,
    },
}

impl SchemaNode {
    pub(crate) fn layout(&self) -> &[LayoutItem] {
        match &self.kind {
            SchemaKind::Dict { layout, .. } => layout,
            _ => &[],
        }
    }

    pub(crate) fn checkbox_key(&self) -> Option<&str> {
        match &self.kind {
            SchemaKind::Dict { checkbox_key, .. } => checkbox_key.as_deref(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

pub(super) fn join_path(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{parent}/{segment}")
    }
}

fn str_field(data: &Document, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(str::to_string)
}

fn bool_field(data: &Document, key: &str) -> bool {
    data.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Parse the root schema: a dict without key whose children are categories
/// or files.
pub(crate) fn parse_root(schema: &Value) -> Result<Rc<SchemaNode>, SettingsError> {
    let Value::Object(data) = schema else {
        return Err(SettingsError::schema("", "Root schema must be an object"));
    };
    let (children, layout) = parse_dict_children(data, "")?;
    Ok(Rc::new(SchemaNode {
        data: data.clone(),
        key: None,
        label: str_field(data, "label"),
        is_group: false,
        is_file: false,
        auto_group: false,
        env_group_key: None,
        kind: SchemaKind::Dict {
            children,
            layout,
            checkbox_key: None,
        },
    }))
}

/// Parse one value item. Dynamic items (children of lists and mutable dicts)
/// don't need a key.
fn parse_item(value: &Value, parent_path: &str, dynamic: bool) -> Result<Rc<SchemaNode>, SettingsError> {
    let Value::Object(data) = value else {
        return Err(SettingsError::schema(parent_path, format!("Schema item must be an object, got {value}")));
    };
    let tag = data
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| SettingsError::schema(parent_path, "Schema item is missing \"type\""))?;
    let schema_type = SchemaType::parse(tag)
        .ok_or_else(|| SettingsError::schema(parent_path, format!("Unknown schema type \"{tag}\"")))?;

    let key = str_field(data, "key");
    if key.is_none() && !dynamic {
        return Err(SettingsError::schema(
            parent_path,
            format!("Schema item of type \"{tag}\" is missing \"key\""),
        ));
    }
    let path = join_path(parent_path, key.as_deref().unwrap_or("<item>"));

    let mut auto_group = true;
    let kind = match schema_type {
        SchemaType::Boolean => SchemaKind::Input(InputKind::Boolean),
        SchemaType::Number => SchemaKind::Input(InputKind::Number {
            decimal: data.get("decimal").and_then(Value::as_u64).unwrap_or(0) as u32,
        }),
        SchemaType::Text => SchemaKind::Input(InputKind::Text),
        SchemaType::Enum => SchemaKind::Input(parse_enum(data, &path)?),
        SchemaType::PathInput => SchemaKind::Input(InputKind::PathInput {
            with_arguments: bool_field(data, "with_arguments"),
        }),
        SchemaType::RawJson => SchemaKind::Input(InputKind::RawJson),
        SchemaType::Path => expand_path(data),
        SchemaType::Dict => {
            auto_group = false;
            let (children, layout) = parse_dict_children(data, &path)?;
            let checkbox_key = str_field(data, "checkbox_key");
            if let Some(checkbox_key) = &checkbox_key {
                let is_bool = children.iter().any(|child| {
                    child.key.as_deref() == Some(checkbox_key.as_str())
                        && matches!(child.kind, SchemaKind::Input(InputKind::Boolean))
                });
                if !is_bool {
                    return Err(SettingsError::schema(
                        &path,
                        format!("Checkbox key \"{checkbox_key}\" must be a boolean child"),
                    ));
                }
            }
            SchemaKind::Dict {
                children,
                layout,
                checkbox_key,
            }
        }
        SchemaType::DictModifiable => {
            let required_keys: Vec<String> = data
                .get("required_keys")
                .and_then(Value::as_array)
                .map(|keys| keys.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default();
            if let Some(invalid) = required_keys.iter().find(|key| !KEY_REGEX.is_match(key)) {
                return Err(SettingsError::schema(&path, format!("Required key \"{invalid}\" is not a valid key")));
            }
            SchemaKind::DictMutable {
                item: parse_object_type(data, &path)?,
                value_is_env_group: bool_field(data, "value_is_env_group"),
                collapsible_key: bool_field(data, "collapsable_key") || bool_field(data, "collapsible_key"),
                required_keys,
            }
        }
        SchemaType::List => SchemaKind::List {
            item: parse_object_type(data, &path)?,
        },
        SchemaType::ListStrict => {
            let items = data
                .get("object_types")
                .and_then(Value::as_array)
                .ok_or_else(|| SettingsError::schema(&path, "List strict is missing \"object_types\""))?
                .iter()
                .map(|item| parse_item(item, &path, true))
                .collect::<Result<Vec<_>, _>>()?;
            SchemaKind::ListStrict { items }
        }
        SchemaType::Wrapper | SchemaType::Gui => {
            return Err(SettingsError::schema(
                &path,
                format!("Schema type \"{tag}\" can be used only as a dict child"),
            ))
        }
    };

    Ok(Rc::new(SchemaNode {
        data: data.clone(),
        key,
        label: str_field(data, "label"),
        is_group: bool_field(data, "is_group"),
        is_file: bool_field(data, "is_file"),
        auto_group,
        env_group_key: str_field(data, "env_group_key"),
        kind,
    }))
}

fn parse_enum(data: &Document, path: &str) -> Result<InputKind, SettingsError> {
    let mut items = Vec::new();
    let mut seen = BTreeSet::new();
    for item in data.get("enum_items").and_then(Value::as_array).into_iter().flatten() {
        let Value::Object(item) = item else {
            return Err(SettingsError::schema(path, "Enum items must be objects"));
        };
        for (key, label) in item {
            if !seen.insert(key.clone()) {
                return Err(SettingsError::schema(path, format!("Enum item \"{key}\" is duplicated")));
            }
            let label = label.as_str().map(str::to_string).unwrap_or_else(|| key.clone());
            items.push((key.clone(), label));
        }
    }
    if items.is_empty() {
        return Err(SettingsError::schema(path, "Enum has no items"));
    }
    Ok(InputKind::Enum {
        items,
        multiselection: bool_field(data, "multiselection"),
    })
}

/// `object_type` is a full schema item or a type name with
/// `input_modifiers`.
fn parse_object_type(data: &Document, path: &str) -> Result<Rc<SchemaNode>, SettingsError> {
    match data.get("object_type") {
        Some(item @ Value::Object(_)) => parse_item(item, path, true),
        Some(Value::String(tag)) => {
            let mut item = data
                .get("input_modifiers")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            item.insert("type".to_string(), Value::String(tag.clone()));
            parse_item(&Value::Object(item), path, true)
        }
        _ => Err(SettingsError::schema(path, "Schema item is missing \"object_type\"")),
    }
}

/// Expand a path widget into a path input, a list of them or a dict keyed by
/// platform.
fn expand_path(data: &Document) -> SchemaKind {
    if !bool_field(data, "multiplatform") {
        return path_platform_node(data, None).kind;
    }
    let children = PATH_PLATFORMS
        .iter()
        .map(|platform| Rc::new(path_platform_node(data, Some(platform.to_string()))))
        .collect();
    let layout = PATH_PLATFORMS
        .iter()
        .map(|platform| LayoutItem::Entity(platform.to_string()))
        .collect();
    SchemaKind::Dict {
        children,
        layout,
        checkbox_key: None,
    }
}

fn path_platform_node(data: &Document, key: Option<String>) -> SchemaNode {
    let with_arguments = bool_field(data, "with_arguments");
    if !bool_field(data, "multipath") {
        return path_input_node(with_arguments, key);
    }
    let mut list_data = Document::new();
    list_data.insert("type".to_string(), Value::from("list"));
    SchemaNode {
        data: list_data,
        key,
        label: None,
        is_group: false,
        is_file: false,
        auto_group: true,
        env_group_key: None,
        kind: SchemaKind::List {
            item: Rc::new(path_input_node(with_arguments, None)),
        },
    }
}

fn path_input_node(with_arguments: bool, key: Option<String>) -> SchemaNode {
    let mut input_data = Document::new();
    input_data.insert("type".to_string(), Value::from("path-input"));
    input_data.insert("with_arguments".to_string(), Value::Bool(with_arguments));
    SchemaNode {
        data: input_data,
        key,
        label: None,
        is_group: false,
        is_file: false,
        auto_group: true,
        env_group_key: None,
        kind: SchemaKind::Input(InputKind::PathInput { with_arguments }),
    }
}

fn parse_dict_children(
    data: &Document,
    path: &str,
) -> Result<(Vec<Rc<SchemaNode>>, Vec<LayoutItem>), SettingsError> {
    let items = data
        .get("children")
        .and_then(Value::as_array)
        .ok_or_else(|| SettingsError::schema(path, "Dict schema is missing \"children\""))?;
    let mut children = Vec::new();
    let mut keys = BTreeSet::new();
    let layout = parse_layout(items, path, &mut children, &mut keys)?;
    Ok((children, layout))
}

/// Flatten wrappers into `children` and keep their structure in the layout.
fn parse_layout(
    items: &[Value],
    path: &str,
    children: &mut Vec<Rc<SchemaNode>>,
    keys: &mut BTreeSet<String>,
) -> Result<Vec<LayoutItem>, SettingsError> {
    let mut layout = Vec::with_capacity(items.len());
    for item in items {
        let tag = item.get("type").and_then(Value::as_str).unwrap_or_default();
        match SchemaType::parse(tag) {
            Some(SchemaType::Gui) => {
                layout.push(LayoutItem::Gui(item.as_object().cloned().unwrap_or_default()));
            }
            Some(SchemaType::Wrapper) => {
                let mut schema = item.as_object().cloned().unwrap_or_default();
                let inner = match schema.remove("children") {
                    Some(Value::Array(inner)) => inner,
                    _ => Vec::new(),
                };
                layout.push(LayoutItem::Wrapper {
                    schema,
                    children: parse_layout(&inner, path, children, keys)?,
                });
            }
            _ => {
                let child = parse_item(item, path, false)?;
                let key = child.key.clone().unwrap_or_default();
                if !keys.insert(key.clone()) {
                    return Err(SettingsError::SchemaDuplicatedKeys {
                        path: path.to_string(),
                        key,
                    });
                }
                layout.push(LayoutItem::Entity(key));
                children.push(child);
            }
        }
    }
    Ok(layout)
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl EntityTree {
    /// Create the entity for `schema` under `parent`.
    ///
    /// The new entity is not registered in the parent's children; the caller
    /// does that.
    pub(crate) fn instantiate(
        &mut self,
        schema: &Rc<SchemaNode>,
        parent: Option<EntityId>,
        key: Option<String>,
        dynamic: bool,
    ) -> EntityId {
        let (group_item, file_item, is_in_dynamic_item, state) = match parent {
            Some(parent) => {
                let parent_node = self.node(parent);
                (
                    if parent_node.is_group {
                        Some(parent)
                    } else {
                        parent_node.group_item
                    },
                    if parent_node.schema.is_file {
                        Some(parent)
                    } else {
                        parent_node.file_item
                    },
                    parent_node.is_dynamic(),
                    parent_node.state,
                )
            }
            None => (None, None, false, OverrideState::NotDefined),
        };

        let kind = match &schema.kind {
            SchemaKind::Input(kind) => NodeKind::Input(InputEntity::new(kind.clone())),
            SchemaKind::Dict { .. } => NodeKind::DictFixed(DictFixedEntity::default()),
            SchemaKind::DictMutable { .. } => NodeKind::DictMutable(DictMutableEntity::default()),
            SchemaKind::List { .. } => NodeKind::List(ListEntity::default()),
            SchemaKind::ListStrict { .. } => NodeKind::ListStrict(ListStrictEntity::default()),
        };

        let id = self.alloc(Node {
            schema: Rc::clone(schema),
            parent,
            key: key.or_else(|| schema.key.clone()),
            is_group: schema.is_group || (schema.auto_group && group_item.is_none()),
            group_item,
            file_item,
            is_dynamic_item: dynamic,
            is_in_dynamic_item,
            env_group_key: schema.env_group_key.clone(),
            state,
            flags: OverrideFlags::default(),
            ignore_child_changes: false,
            kind,
        });

        match &schema.kind {
            SchemaKind::Dict { children, .. } => {
                let ids = children
                    .iter()
                    .map(|child| self.instantiate(child, Some(id), None, false))
                    .collect();
                if let NodeKind::DictFixed(dict) = &mut self.node_mut(id).kind {
                    dict.children = ids;
                }
            }
            SchemaKind::ListStrict { items } => {
                let ids = items
                    .iter()
                    .map(|item| self.instantiate(item, Some(id), None, true))
                    .collect();
                if let NodeKind::ListStrict(list) = &mut self.node_mut(id).kind {
                    list.children = ids;
                }
            }
            _ => {}
        }
        id
    }

    // -- Validation --

    pub(crate) fn validate(&mut self) -> Result<(), SettingsError> {
        let mut report = ValidationReport::default();
        self.collect_issues(self.root, &mut report);
        report.into_result()
    }

    fn collect_issues(&mut self, id: EntityId, report: &mut ValidationReport) {
        let node = self.node(id);
        let is_root = node.parent.is_none();

        if node.schema.is_group && node.schema.label.is_none() {
            report.first_error.get_or_insert_with(|| {
                SettingsError::schema(self.path(id), "Item is set as `is_group` but has empty `label`")
            });
        }
        let node = self.node(id);
        if node.is_dynamic_item && node.schema.label.is_some() {
            report.first_error.get_or_insert_with(|| {
                SettingsError::schema(self.path(id), "Item has set label but is used as dynamic item")
            });
        }

        if node.is_group {
            if let Some(group_item) = node.group_item {
                let group_path = self.path(group_item);
                report.group_bugs.insert(group_path);
                report.group_bugs.insert(self.path(id));
            }
        }

        let node = self.node(id);
        let in_file = node.schema.is_file || node.file_item.is_some();
        let is_dict = matches!(node.kind, NodeKind::DictFixed(_));
        if !is_root && !is_dict && !in_file && !node.is_dynamic() {
            report.missing_file.push(self.path(id));
        }

        if let Some(env_key) = node.env_group_key.clone() {
            if !in_file {
                report.first_error.get_or_insert_with(|| {
                    SettingsError::schema(self.path(id), "Environment group must be inside a file")
                });
            }
            if !self.node(id).is_dynamic() {
                report.env_groups.entry(env_key).or_default().push(self.path(id));
            }
        }

        let item_schema = match &self.node(id).schema.kind {
            SchemaKind::DictMutable { item, .. } | SchemaKind::List { item } => Some(Rc::clone(item)),
            _ => None,
        };
        match item_schema {
            Some(item) => {
                let sample = self.instantiate(&item, Some(id), None, true);
                self.collect_issues(sample, report);
                self.free_subtree(sample);
            }
            None => {
                for child in self.child_ids(id) {
                    self.collect_issues(child, report);
                }
            }
        }
    }
}

#[derive(Default)]
struct ValidationReport {
    first_error: Option<SettingsError>,
    group_bugs: BTreeSet<String>,
    missing_file: Vec<String>,
    env_groups: BTreeMap<String, Vec<String>>,
}

impl ValidationReport {
    fn into_result(self) -> Result<(), SettingsError> {
        if let Some(err) = self.first_error {
            return Err(err);
        }
        if !self.group_bugs.is_empty() {
            return Err(SettingsError::SchemeGroupHierarchyBug(
                self.group_bugs.into_iter().collect(),
            ));
        }
        if !self.missing_file.is_empty() {
            return Err(SettingsError::SchemaMissingFileInfo(self.missing_file));
        }
        let duplicated: BTreeMap<String, Vec<String>> = self
            .env_groups
            .into_iter()
            .filter(|(_, paths)| paths.len() > 1)
            .collect();
        if !duplicated.is_empty() {
            return Err(SettingsError::SchemaDuplicatedEnvGroupKeys(duplicated));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::entities::EntityType;

    fn build(children: Value) -> Result<EntityTree, SettingsError> {
        EntityTree::from_schema(&json!({"children": children}))
    }

    // -- parsing --

    #[test]
    fn test_wrappers_are_flattened() {
        let tree = build(json!([{
            "type": "dict",
            "key": "general",
            "is_file": true,
            "children": [
                {"type": "label", "label": "Studio"},
                {"type": "collapsible-wrap", "label": "Naming", "children": [
                    {"type": "text", "key": "studio_name"},
                    {"type": "text", "key": "studio_code"}
                ]}
            ]
        }]))
        .unwrap();
        let general = tree.entity_by_path("general").unwrap();
        assert_eq!(tree.children(general).len(), 2);
        assert!(tree.child(general, "studio_code").is_some());
        assert_matches!(tree.gui_layout(general)[0], LayoutItem::Gui(_));
        assert_matches!(
            &tree.gui_layout(general)[1],
            LayoutItem::Wrapper { children, .. } if children.len() == 2
        );
    }

    #[test]
    fn test_duplicated_keys_fail() {
        let err = build(json!([{
            "type": "dict", "key": "general", "is_file": true,
            "children": [
                {"type": "text", "key": "name"},
                {"type": "form", "children": [{"type": "text", "key": "name"}]}
            ]
        }]))
        .unwrap_err();
        assert_matches!(err, SettingsError::SchemaDuplicatedKeys { ref key, .. } if key == "name");
    }

    #[test]
    fn test_unknown_type_fails() {
        let err = build(json!([{"type": "color", "key": "c", "is_file": true}])).unwrap_err();
        assert_matches!(err, SettingsError::SchemaError { ref reason, .. } if reason.contains("color"));
    }

    #[test]
    fn test_enum_requires_items() {
        let err = build(json!([{"type": "enum", "key": "e", "is_file": true, "enum_items": []}])).unwrap_err();
        assert_matches!(err, SettingsError::SchemaError { .. });
    }

    #[test]
    fn test_checkbox_key_must_be_boolean() {
        let err = build(json!([{
            "type": "dict", "key": "maya", "is_file": true, "checkbox_key": "enabled",
            "children": [{"type": "text", "key": "enabled"}]
        }]))
        .unwrap_err();
        assert_matches!(err, SettingsError::SchemaError { ref reason, .. } if reason.contains("Checkbox"));
    }

    #[test]
    fn test_list_object_type_by_name() {
        let tree = build(json!([{
            "type": "list", "key": "tags", "is_file": true, "object_type": "text"
        }]))
        .unwrap();
        assert_eq!(tree.entity_type(tree.entity_by_path("tags").unwrap()), EntityType::List);
    }

    // -- path widget --

    #[test]
    fn test_path_widget_expansion() {
        let tree = build(json!([{
            "type": "dict", "key": "paths", "is_file": true,
            "children": [
                {"type": "path-widget", "key": "single"},
                {"type": "path-widget", "key": "multi", "multipath": true},
                {"type": "path-widget", "key": "platforms", "multiplatform": true, "multipath": true}
            ]
        }]))
        .unwrap();
        let single = tree.entity_by_path("paths/single").unwrap();
        assert_eq!(tree.entity_type(single), EntityType::PathInput);
        assert!(tree.is_group(single));

        let multi = tree.entity_by_path("paths/multi").unwrap();
        assert_eq!(tree.entity_type(multi), EntityType::List);

        let platforms = tree.entity_by_path("paths/platforms").unwrap();
        assert_eq!(tree.entity_type(platforms), EntityType::Dict);
        assert!(tree.is_group(platforms));
        let linux = tree.entity_by_path("paths/platforms/linux").unwrap();
        assert_eq!(tree.entity_type(linux), EntityType::List);
        assert!(!tree.is_group(linux));
    }

    // -- tree validations --

    #[test]
    fn test_nested_groups_fail() {
        let err = build(json!([{
            "type": "dict", "key": "general", "label": "General", "is_file": true, "is_group": true,
            "children": [{"type": "dict", "key": "inner", "label": "Inner", "is_group": true, "children": [
                {"type": "text", "key": "name"}
            ]}]
        }]))
        .unwrap_err();
        assert_matches!(
            err,
            SettingsError::SchemeGroupHierarchyBug(ref paths)
                if paths == &vec!["general".to_string(), "general/inner".to_string()]
        );
    }

    #[test]
    fn test_group_inside_list_item_fails() {
        let err = build(json!([{
            "type": "list", "key": "items", "is_file": true,
            "object_type": {"type": "dict", "children": [
                {"type": "dict", "key": "inner", "label": "Inner", "is_group": true, "children": [
                    {"type": "text", "key": "a"}
                ]}
            ]}
        }]))
        .unwrap_err();
        assert_matches!(err, SettingsError::SchemeGroupHierarchyBug(_));
    }

    #[test]
    fn test_group_without_label_fails() {
        let err = build(json!([{
            "type": "dict", "key": "general", "is_file": true, "is_group": true,
            "children": [{"type": "text", "key": "name"}]
        }]))
        .unwrap_err();
        assert_matches!(
            err,
            SettingsError::SchemaError { ref path, ref reason }
                if path == "general" && reason.contains("empty `label`")
        );
    }

    #[test]
    fn test_label_on_dynamic_item_fails() {
        let err = build(json!([{
            "type": "list", "key": "items", "is_file": true,
            "object_type": {"type": "text", "label": "Item"}
        }]))
        .unwrap_err();
        assert_matches!(
            err,
            SettingsError::SchemaError { ref reason, .. } if reason.contains("dynamic item")
        );

        let err = build(json!([{
            "type": "list-strict", "key": "size", "is_file": true,
            "object_types": [{"type": "number", "label": "Width"}, {"type": "number"}]
        }]))
        .unwrap_err();
        assert_matches!(err, SettingsError::SchemaError { ref path, .. } if path == "size/0");
    }

    #[test]
    fn test_labels_on_static_items_pass() {
        let tree = build(json!([{
            "type": "dict", "key": "general", "label": "General", "is_file": true, "is_group": true,
            "children": [{"type": "text", "key": "name", "label": "Name"}]
        }]))
        .unwrap();
        assert!(tree.is_group(tree.entity_by_path("general").unwrap()));
    }

    #[test]
    fn test_missing_file_info_fails() {
        let err = build(json!([{
            "type": "dict", "key": "general",
            "children": [{"type": "text", "key": "name"}, {"type": "boolean", "key": "flag"}]
        }]))
        .unwrap_err();
        assert_matches!(
            err,
            SettingsError::SchemaMissingFileInfo(ref paths) if paths.len() == 2
        );
    }

    #[test]
    fn test_duplicated_env_group_keys_fail() {
        let err = build(json!([{
            "type": "dict", "key": "apps", "is_file": true,
            "children": [
                {"type": "raw-json", "key": "maya_env", "env_group_key": "maya"},
                {"type": "raw-json", "key": "maya_env_2", "env_group_key": "maya"}
            ]
        }]))
        .unwrap_err();
        assert_matches!(
            err,
            SettingsError::SchemaDuplicatedEnvGroupKeys(ref groups) if groups["maya"].len() == 2
        );
    }

    #[test]
    fn test_item_samples_are_freed() {
        let tree = build(json!([{
            "type": "dict-modifiable", "key": "apps", "is_file": true,
            "object_type": {"type": "dict", "children": [{"type": "text", "key": "a"}]}
        }]))
        .unwrap();
        let apps = tree.entity_by_path("apps").unwrap();
        assert!(tree.children(apps).is_empty());
        assert_eq!(tree.slots.len() - tree.free.len(), 2);
    }
}
