use std::collections::BTreeMap;
use std::path::PathBuf;

/// Expected failures of the settings system.
///
/// Schema-authoring errors are raised while building a tree, value errors
/// while editing it, and storage errors while loading or saving.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    // -- Value errors --
    #[error("Invalid value type at \"{path}\". Expected: {expected} Got: {got}")]
    InvalidValueType {
        path: String,
        expected: String,
        got: String,
    },

    #[error("Invalid enum item {item} at \"{path}\". Expected one of: {}", .valid.join(", "))]
    InvalidEnumItem {
        path: String,
        item: String,
        valid: Vec<String>,
    },

    #[error("Default values for entity are not set. {0}")]
    DefaultsNotDefined(String),

    #[error("Studio default values for entity are not set. {0}")]
    StudioDefaultsNotDefined(String),

    // -- Container errors --
    #[error("Key \"{key}\" was not found in \"{path}\"")]
    KeyNotFound { path: String, key: String },

    #[error("Key \"{key}\" already exists in \"{path}\"")]
    KeyAlreadyExists { path: String, key: String },

    #[error("Invalid key \"{key}\" in \"{path}\". Allowed symbols: {allowed}")]
    InvalidKey {
        path: String,
        key: String,
        allowed: &'static str,
    },

    #[error("Required key \"{key}\" of \"{path}\" can't be removed or renamed")]
    RequiredKeyModified { path: String, key: String },

    #[error("Index {index} is out of range for \"{path}\" with {len} items")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("Value {value} was not found in \"{path}\"")]
    ValueNotFound { path: String, value: String },

    #[error("Entity \"{path}\" of type {entity_type} does not support \"{operation}\"")]
    UnsupportedOperation {
        path: String,
        operation: &'static str,
        entity_type: String,
    },

    #[error("Invalid override state: {0}")]
    InvalidOverrideState(String),

    // -- Schema errors --
    #[error("Schema item contain duplicated key \"{key}\" in one hierarchy level. {path}")]
    SchemaDuplicatedKeys { path: String, key: String },

    #[error(
        "Items with attribute \"is_group\" can't have another item with \"is_group\" \
         attribute as child. Error happened for keys: [{}]",
        quote_join(.0)
    )]
    SchemeGroupHierarchyBug(Vec<String>),

    #[error(
        "Schema has missing definition of output file (\"is_file\" key) for keys. [{}]",
        quote_join(.0)
    )]
    SchemaMissingFileInfo(Vec<String>),

    #[error(
        "Schema items contain duplicated environment group keys. {}",
        format_locations(.0)
    )]
    SchemaDuplicatedEnvGroupKeys(BTreeMap<String, Vec<String>>),

    #[error(
        "Schema template {} require more keys. Required keys: {} Missing keys: {}",
        .template.as_deref().unwrap_or("<inline>"),
        quote_join(.required),
        quote_join(.missing)
    )]
    SchemaTemplateMissingKeys {
        template: Option<String>,
        required: Vec<String>,
        missing: Vec<String>,
    },

    #[error("Schema error at \"{path}\": {reason}")]
    SchemaError { path: String, reason: String },

    // -- Environment errors --
    #[error(
        "Duplicated environment group keys. {}",
        format_locations(.0)
    )]
    DuplicatedEnvGroups(BTreeMap<String, Vec<String>>),

    // -- Storage errors --
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SettingsError {
    /// Build a [`SettingsError::SchemaError`] for the given entity path.
    pub fn schema(path: impl Into<String>, reason: impl Into<String>) -> Self {
        SettingsError::SchemaError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an [`std::io::Error`] with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SettingsError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used across the crate.
pub type SettingsResult<T> = Result<T, SettingsError>;

fn quote_join(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("\"{item}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_locations(locations: &BTreeMap<String, Vec<String>>) -> String {
    locations
        .iter()
        .map(|(key, paths)| format!("\"{key}\" ({})", quote_join(paths)))
        .collect::<Vec<_>>()
        .join(" || ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_hierarchy_message_lists_paths() {
        let err = SettingsError::SchemeGroupHierarchyBug(vec![
            "general/a".to_string(),
            "general/a/b".to_string(),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("\"general/a\", \"general/a/b\""));
    }

    #[test]
    fn test_duplicated_env_groups_message() {
        let mut locations = BTreeMap::new();
        locations.insert(
            "maya".to_string(),
            vec!["applications/maya".to_string(), "tools/maya".to_string()],
        );
        let msg = SettingsError::DuplicatedEnvGroups(locations).to_string();
        assert!(msg.contains("\"maya\" (\"applications/maya\", \"tools/maya\")"));
    }

    #[test]
    fn test_template_missing_keys_message() {
        let err = SettingsError::SchemaTemplateMissingKeys {
            template: Some("template_host".to_string()),
            required: vec!["host".to_string(), "label".to_string()],
            missing: vec!["label".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("template_host"));
        assert!(msg.contains("Missing keys: \"label\""));
    }
}
