//! Inlining of `schema` and `schema_template` references.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::SchemaCollection;
use crate::error::SettingsError;
use crate::types::Document;

/// `{placeholder}` tokens inside template strings.
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-zA-Z_][a-zA-Z0-9_]*)\}").expect("valid regex"));

/// Template item holding fallback values for placeholders.
pub const DEFAULT_VALUES_KEY: &str = "__default_values__";

const CHILDREN_KEY: &str = "children";
const OBJECT_TYPE_KEY: &str = "object_type";

// ---------------------------------------------------------------------------
// Inner schemas
// ---------------------------------------------------------------------------

/// Resolve every reference in `children` and `object_type` of `schema`.
pub(super) fn fill_inner_schemas(
    mut schema: Document,
    collection: &SchemaCollection,
    depth: usize,
) -> Result<Document, SettingsError> {
    check_depth(depth)?;

    if schema_type(&schema) == Some("schema") {
        return Err(SettingsError::schema(
            schema_name(&schema).unwrap_or_default(),
            "First item in schema data can't be schema",
        ));
    }

    if let Some(Value::Array(children)) = schema.remove(CHILDREN_KEY) {
        let mut filled = Vec::with_capacity(children.len());
        for child in children {
            filled.extend(fill_child(child, collection, depth)?);
        }
        schema.insert(CHILDREN_KEY.to_string(), Value::Array(filled));
    }

    if let Some(object_type) = schema.remove(OBJECT_TYPE_KEY) {
        let filled = match object_type {
            Value::Object(_) => {
                let mut items = fill_child(object_type, collection, depth)?;
                if items.len() != 1 {
                    return Err(SettingsError::schema(
                        schema_key(&schema).unwrap_or_default(),
                        format!(
                            "Failed to fill object type, reference resolved to {} items",
                            items.len()
                        ),
                    ));
                }
                items.remove(0)
            }
            other => other,
        };
        schema.insert(OBJECT_TYPE_KEY.to_string(), filled);
    }

    Ok(schema)
}

fn fill_child(
    child: Value,
    collection: &SchemaCollection,
    depth: usize,
) -> Result<Vec<Value>, SettingsError> {
    let Value::Object(child) = child else {
        return Ok(vec![child]);
    };

    match schema_type(&child) {
        Some("schema") => {
            let name = schema_name(&child).unwrap_or_default();
            let schema = collection.schema(name).ok_or_else(|| {
                let reason = if collection.template(name).is_some() {
                    format!("Schema template \"{name}\" is used as `schema`")
                } else {
                    format!("Schema \"{name}\" was not found")
                };
                SettingsError::schema(name, reason)
            })?;
            let filled = fill_inner_schemas(schema.clone(), collection, depth + 1)?;
            Ok(vec![Value::Object(filled)])
        }
        Some("schema_template") => fill_schema_template(&child, collection, depth + 1),
        _ => Ok(vec![Value::Object(fill_inner_schemas(
            child, collection, depth,
        )?)]),
    }
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// Expand a `schema_template` reference into the schema items it produces.
///
/// `template_data` may be an object or a list of objects; each object yields
/// one copy of the template.
pub(super) fn fill_schema_template(
    reference: &Document,
    collection: &SchemaCollection,
    depth: usize,
) -> Result<Vec<Value>, SettingsError> {
    check_depth(depth)?;

    let name = schema_name(reference).unwrap_or_default();
    let template = collection.template(name).ok_or_else(|| {
        let reason = if collection.schema(name).is_some() {
            format!("Schema \"{name}\" is used as `schema_template`")
        } else {
            format!("Schema template \"{name}\" was not found")
        };
        SettingsError::schema(name, reason)
    })?;

    let data_items = match reference.get("template_data") {
        None | Some(Value::Null) => vec![Document::new()],
        Some(Value::Object(data)) => vec![data.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Object(data) => Ok(data.clone()),
                _ => Err(SettingsError::schema(
                    name,
                    "Items of `template_data` must be objects",
                )),
            })
            .collect::<Result<_, _>>()?,
        Some(_) => {
            return Err(SettingsError::schema(
                name,
                "`template_data` must be an object or a list of objects",
            ))
        }
    };

    let mut output = Vec::new();
    for data in data_items {
        let filled = fill_template_data(template, data).map_err(|err| match err {
            SettingsError::SchemaTemplateMissingKeys {
                required, missing, ..
            } => SettingsError::SchemaTemplateMissingKeys {
                template: Some(name.to_string()),
                required,
                missing,
            },
            other => other,
        })?;

        for item in filled {
            output.extend(fill_child(item, collection, depth)?);
        }
    }
    Ok(output)
}

/// Fill placeholders of a template with `data`.
///
/// A `{"__default_values__": {...}}` item of the template provides values for
/// keys missing in `data` and is dropped from the output.
pub fn fill_template_data(template: &[Value], mut data: Document) -> Result<Vec<Value>, SettingsError> {
    let mut items = Vec::with_capacity(template.len());
    for item in template {
        match item.get(DEFAULT_VALUES_KEY) {
            Some(Value::Object(defaults)) => {
                for (key, value) in defaults {
                    if !data.contains_key(key) {
                        data.insert(key.clone(), value.clone());
                    }
                }
            }
            _ => items.push(item),
        }
    }

    let mut required = BTreeSet::new();
    let mut missing = BTreeSet::new();
    let output = items
        .into_iter()
        .map(|item| fill_value(item, &data, &mut required, &mut missing))
        .collect();

    if !missing.is_empty() {
        return Err(SettingsError::SchemaTemplateMissingKeys {
            template: None,
            required: required.into_iter().collect(),
            missing: missing.into_iter().collect(),
        });
    }
    Ok(output)
}

fn fill_value(
    value: &Value,
    data: &Document,
    required: &mut BTreeSet<String>,
    missing: &mut BTreeSet<String>,
) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| fill_value(item, data, required, missing))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), fill_value(item, data, required, missing)))
                .collect(),
        ),
        Value::String(text) => fill_string(text, data, required, missing),
        other => other.clone(),
    }
}

fn fill_string(
    text: &str,
    data: &Document,
    required: &mut BTreeSet<String>,
    missing: &mut BTreeSet<String>,
) -> Value {
    let mut output = text.to_string();
    for captures in PLACEHOLDER_RE.captures_iter(text) {
        let token = &captures[0];
        let key = &captures[1];
        required.insert(key.to_string());

        let Some(replacement) = data.get(key) else {
            missing.insert(key.to_string());
            continue;
        };

        // Whole-string placeholder keeps the typed value.
        if token == text {
            return replacement.clone();
        }
        let replacement = match replacement {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        output = output.replace(token, &replacement);
    }
    Value::String(output)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Guards against reference cycles between schema files.
const MAX_DEPTH: usize = 64;

fn check_depth(depth: usize) -> Result<(), SettingsError> {
    if depth > MAX_DEPTH {
        return Err(SettingsError::schema(
            "",
            format!("Schema references are nested deeper than {MAX_DEPTH} levels"),
        ));
    }
    Ok(())
}

fn schema_type(schema: &Document) -> Option<&str> {
    schema.get("type").and_then(Value::as_str)
}

fn schema_name(schema: &Document) -> Option<&str> {
    schema.get("name").and_then(Value::as_str)
}

fn schema_key(schema: &Document) -> Option<&str> {
    schema.get("key").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn data(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_fill_replaces_inside_strings() {
        let template = vec![json!({"type": "text", "key": "{host}_path", "label": "{label} path"})];
        let filled = fill_template_data(&template, data(json!({"host": "maya", "label": "Maya"})))
            .unwrap();
        assert_eq!(
            filled,
            vec![json!({"type": "text", "key": "maya_path", "label": "Maya path"})]
        );
    }

    #[test]
    fn test_whole_placeholder_keeps_type() {
        let template = vec![json!({"type": "number", "key": "count", "decimal": "{decimal}"})];
        let filled = fill_template_data(&template, data(json!({"decimal": 2}))).unwrap();
        assert_eq!(filled[0]["decimal"], json!(2));
    }

    #[test]
    fn test_default_values_fill_missing_keys() {
        let template = vec![
            json!({"__default_values__": {"label": "Default"}}),
            json!({"type": "text", "key": "{key}", "label": "{label}"}),
        ];
        let filled = fill_template_data(&template, data(json!({"key": "name"}))).unwrap();
        assert_eq!(filled.len(), 1);
        assert_eq!(filled[0]["label"], json!("Default"));
    }

    #[test]
    fn test_missing_keys_are_reported() {
        let template = vec![json!({"type": "text", "key": "{key}", "label": "{label}"})];
        let err = fill_template_data(&template, data(json!({"key": "name"}))).unwrap_err();
        assert_matches!(
            err,
            SettingsError::SchemaTemplateMissingKeys { ref missing, ref required, .. }
                if missing == &vec!["label".to_string()] && required.len() == 2
        );
    }

    #[test]
    fn test_non_string_partial_replacement_is_stringified() {
        let template = vec![json!({"label": "Version {version}"})];
        let filled = fill_template_data(&template, data(json!({"version": 2022}))).unwrap();
        assert_eq!(filled[0]["label"], json!("Version 2022"));
    }
}
