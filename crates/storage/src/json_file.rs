//! Reading and writing settings JSON files.

use std::io::ErrorKind;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use pype_settings_core::files::{collect_json_files, key_path_segments};
use pype_settings_core::merge::subkey_merge;
use pype_settings_core::{Document, SettingsError};

/// Load a settings document.
///
/// A missing file is an empty document. So is a file with malformed JSON
/// or a non-object top level, after a warning. Other I/O errors propagate.
pub fn load_json_file(path: &Path) -> Result<Document, SettingsError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Settings file does not exist");
            return Ok(Document::new());
        }
        Err(e) => return Err(SettingsError::io(path, e)),
    };

    if content.trim().is_empty() {
        return Ok(Document::new());
    }

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(other) => {
            tracing::warn!(
                path = %path.display(),
                got = json_kind(&other),
                "Settings file does not contain an object",
            );
            Ok(Document::new())
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to parse settings file");
            Ok(Document::new())
        }
    }
}

/// Write `value` as JSON indented by four spaces, creating parent
/// directories as needed.
pub fn save_json_file(path: &Path, value: &Value) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| SettingsError::io(parent, e))?;
    }

    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;

    std::fs::write(path, buffer).map_err(|e| SettingsError::io(path, e))?;
    tracing::debug!(path = %path.display(), "Saved settings file");
    Ok(())
}

/// Load every JSON file under `dir` into one document keyed by the file
/// paths: `applications/maya.json` lands under `["applications"]["maya"]`.
///
/// A missing directory is an empty document.
pub fn load_jsons_from_dir(dir: &Path) -> Result<Document, SettingsError> {
    let mut output = Document::new();
    if !dir.is_dir() {
        tracing::debug!(path = %dir.display(), "Settings directory does not exist");
        return Ok(output);
    }

    for relative in collect_json_files(dir)? {
        let document = load_json_file(&dir.join(&relative))?;
        let segments = key_path_segments(&relative);
        let keys: Vec<&str> = segments.iter().map(String::as_str).collect();
        subkey_merge(&mut output, Value::Object(document), &keys);
    }
    Ok(output)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
