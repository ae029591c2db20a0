//! Settings schemas.
//!
//! Schemas are JSON documents describing the entity tree. Object documents
//! are schemas, list documents are templates. References between them are
//! resolved here, before any entity is built:
//!
//! - `{"type": "schema", "name": "..."}` inlines the named schema;
//! - `{"type": "schema_template", "name": "...", "template_data": ...}`
//!   inlines the named template with `{placeholder}`s filled.

pub mod kind;
pub mod template;

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

pub use kind::SchemaType;
pub use template::fill_template_data;

use crate::error::SettingsError;
use crate::files::collect_json_files;

/// Subdirectory holding schemas of the system settings.
pub const SYSTEM_SCHEMA_DIR: &str = "system_schema";

/// Subdirectory holding schemas of the project settings and anatomy.
pub const PROJECT_SCHEMA_DIR: &str = "projects_schema";

/// Name of the entry schema in each subdirectory.
pub const MAIN_SCHEMA_NAME: &str = "schema_main";

/// Named schemas and templates available for reference resolution.
#[derive(Debug, Clone, Default)]
pub struct SchemaCollection {
    schemas: BTreeMap<String, Value>,
    templates: BTreeMap<String, Vec<Value>>,
}

impl SchemaCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `.json` file under `dir`, named by file stem.
    ///
    /// A file that does not parse is an error; schemas are authored with the
    /// code and must be valid.
    pub fn from_dir(dir: &Path) -> Result<Self, SettingsError> {
        let mut collection = Self::new();
        for relative in collect_json_files(dir)? {
            let path = dir.join(&relative);
            let name = relative
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_default();

            let content = std::fs::read_to_string(&path).map_err(|e| SettingsError::io(&path, e))?;
            let data: Value = serde_json::from_str(&content).map_err(|e| {
                SettingsError::schema(
                    path.display().to_string(),
                    format!("Unable to parse JSON file: {e}"),
                )
            })?;
            collection.insert(name, data)?;
        }
        tracing::debug!(
            dir = %dir.display(),
            schemas = collection.schemas.len(),
            templates = collection.templates.len(),
            "Loaded settings schemas",
        );
        Ok(collection)
    }

    /// Register a schema (object) or a template (list) under `name`.
    pub fn insert(&mut self, name: impl Into<String>, data: Value) -> Result<(), SettingsError> {
        let name = name.into();
        if self.schemas.contains_key(&name) || self.templates.contains_key(&name) {
            return Err(SettingsError::schema(
                name,
                "Schema name is used by more than one file",
            ));
        }
        match data {
            Value::Array(items) => {
                self.templates.insert(name, items);
            }
            data @ Value::Object(_) => {
                self.schemas.insert(name, data);
            }
            other => {
                return Err(SettingsError::schema(
                    name,
                    format!("Schema file must contain an object or a list, got {other}"),
                ))
            }
        }
        Ok(())
    }

    pub fn schema(&self, name: &str) -> Option<&serde_json::Map<String, Value>> {
        self.schemas.get(name).and_then(Value::as_object)
    }

    pub fn template(&self, name: &str) -> Option<&[Value]> {
        self.templates.get(name).map(Vec::as_slice)
    }

    /// Resolve the named schema with all references inlined.
    pub fn resolve(&self, name: &str) -> Result<Value, SettingsError> {
        let schema = self
            .schema(name)
            .ok_or_else(|| SettingsError::schema(name, format!("Schema \"{name}\" was not found")))?;
        let filled = template::fill_inner_schemas(schema.clone(), self, 0)?;
        Ok(Value::Object(filled))
    }
}

/// Load and resolve the main schema of `subfolder` under `schemas_root`.
pub fn gui_schema(schemas_root: &Path, subfolder: &str) -> Result<Value, SettingsError> {
    SchemaCollection::from_dir(&schemas_root.join(subfolder))?.resolve(MAIN_SCHEMA_NAME)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn collection() -> SchemaCollection {
        let mut collection = SchemaCollection::new();
        collection
            .insert(
                "schema_main",
                json!({
                    "type": "dict",
                    "key": "system",
                    "children": [
                        {"type": "schema", "name": "schema_general"},
                        {
                            "type": "schema_template",
                            "name": "template_host",
                            "template_data": [
                                {"host": "maya", "label": "Maya"},
                                {"host": "nuke", "label": "Nuke"}
                            ]
                        }
                    ]
                }),
            )
            .unwrap();
        collection
            .insert(
                "schema_general",
                json!({
                    "type": "dict",
                    "key": "general",
                    "is_file": true,
                    "children": [{"type": "text", "key": "studio_name"}]
                }),
            )
            .unwrap();
        collection
            .insert(
                "template_host",
                json!([{
                    "type": "dict",
                    "key": "{host}",
                    "label": "{label}",
                    "children": [{"type": "boolean", "key": "enabled"}]
                }]),
            )
            .unwrap();
        collection
    }

    #[test]
    fn test_resolve_inlines_schemas_and_templates() {
        let resolved = collection().resolve("schema_main").unwrap();
        let children = resolved["children"].as_array().unwrap();
        assert_eq!(children.len(), 3);
        assert_eq!(children[0]["key"], json!("general"));
        assert_eq!(children[1]["key"], json!("maya"));
        assert_eq!(children[2]["label"], json!("Nuke"));
    }

    #[test]
    fn test_template_used_as_schema_fails() {
        let mut collection = collection();
        collection
            .insert(
                "broken",
                json!({"type": "dict", "children": [{"type": "schema", "name": "template_host"}]}),
            )
            .unwrap();
        let err = collection.resolve("broken").unwrap_err();
        assert_matches!(err, SettingsError::SchemaError { ref reason, .. } if reason.contains("used as `schema`"));
    }

    #[test]
    fn test_object_type_reference_is_resolved() {
        let mut collection = collection();
        collection
            .insert(
                "with_list",
                json!({
                    "type": "list",
                    "key": "items",
                    "object_type": {"type": "schema", "name": "schema_general"}
                }),
            )
            .unwrap();
        let resolved = collection.resolve("with_list").unwrap();
        assert_eq!(resolved["object_type"]["key"], json!("general"));
    }

    #[test]
    fn test_duplicated_names_fail() {
        let mut collection = collection();
        let err = collection.insert("schema_general", json!({})).unwrap_err();
        assert_matches!(err, SettingsError::SchemaError { .. });
    }

    #[test]
    fn test_missing_template_key_names_template() {
        let mut collection = collection();
        collection
            .insert(
                "missing",
                json!({
                    "type": "dict",
                    "children": [{"type": "schema_template", "name": "template_host", "template_data": {"host": "x"}}]
                }),
            )
            .unwrap();
        let err = collection.resolve("missing").unwrap_err();
        assert_matches!(
            err,
            SettingsError::SchemaTemplateMissingKeys { template: Some(ref name), .. } if name == "template_host"
        );
    }

    #[test]
    fn test_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join(SYSTEM_SCHEMA_DIR);
        std::fs::create_dir_all(sub.join("nested")).unwrap();
        std::fs::write(
            sub.join("schema_main.json"),
            r#"{"type": "dict", "key": "system", "children": [{"type": "schema", "name": "schema_x"}]}"#,
        )
        .unwrap();
        std::fs::write(
            sub.join("nested/schema_x.json"),
            r#"{"type": "text", "key": "x"}"#,
        )
        .unwrap();

        let resolved = gui_schema(dir.path(), SYSTEM_SCHEMA_DIR).unwrap();
        assert_eq!(resolved["children"][0]["key"], json!("x"));
    }
}
