//! Merging of sparse override documents into their base layer.
//!
//! An override document only stores what differs from the layer below it.
//! Each dict level may carry [`M_OVERRIDEN_KEY`] listing keys that must
//! replace the base value wholesale instead of being deep-merged.

use std::collections::HashSet;

use serde_json::Value;

use crate::constants::{is_metadata_key, M_OVERRIDEN_KEY, M_POP_KEY};
use crate::types::Document;

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Resolve `overrides` on top of `base` and return the merged document.
///
/// `base` is never modified. An empty override returns a copy of `base`.
pub fn apply_overrides(base: &Document, overrides: &Document) -> Document {
    let mut output = base.clone();
    if overrides.is_empty() {
        return output;
    }
    merge_overrides(&mut output, overrides.clone());
    output
}

/// Merge `overrides` into `source` in place.
///
/// For each key of `overrides`:
/// - the [`M_POP_KEY`] value removes the key from `source`;
/// - keys listed in [`M_OVERRIDEN_KEY`] or missing in `source` are replaced;
/// - dict against dict recurses;
/// - anything else is replaced.
pub fn merge_overrides(source: &mut Document, mut overrides: Document) {
    let overriden_keys = take_overriden_keys(&mut overrides);

    for (key, value) in overrides {
        if value.as_str() == Some(M_POP_KEY) {
            source.remove(&key);
            continue;
        }

        if overriden_keys.contains(&key) {
            source.insert(key, value);
            continue;
        }

        let both_dicts = value.is_object() && source.get(&key).is_some_and(Value::is_object);
        if !both_dicts {
            source.insert(key, value);
            continue;
        }
        if let (Some(Value::Object(source_child)), Value::Object(override_child)) =
            (source.get_mut(&key), value)
        {
            merge_overrides(source_child, override_child);
        }
    }
}

fn take_overriden_keys(overrides: &mut Document) -> HashSet<String> {
    match overrides.remove(M_OVERRIDEN_KEY) {
        Some(Value::Array(keys)) => keys
            .into_iter()
            .filter_map(|key| match key {
                Value::String(key) => Some(key),
                _ => None,
            })
            .collect(),
        Some(other) => {
            tracing::warn!(value = %other, "Ignoring malformed overriden keys metadata");
            HashSet::new()
        }
        None => HashSet::new(),
    }
}

// ---------------------------------------------------------------------------
// Metadata cleanup
// ---------------------------------------------------------------------------

/// Remove all metadata keys from `value`, recursively.
pub fn clear_metadata_from_settings(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !is_metadata_key(key));
            for child in map.values_mut() {
                clear_metadata_from_settings(child);
            }
        }
        Value::Array(items) => {
            for item in items {
                clear_metadata_from_settings(item);
            }
        }
        _ => {}
    }
}

/// Same as [`clear_metadata_from_settings`] for a whole document.
pub fn clear_metadata_from_document(document: &mut Document) {
    document.retain(|key, _| !is_metadata_key(key));
    for child in document.values_mut() {
        clear_metadata_from_settings(child);
    }
}

// ---------------------------------------------------------------------------
// Nested keys
// ---------------------------------------------------------------------------

/// Insert `value` into `document` under the nested path `keys`.
///
/// Missing intermediate levels are created. A non-object intermediate value
/// is replaced by an object.
pub fn subkey_merge(document: &mut Document, value: Value, keys: &[&str]) {
    let Some((last, parents)) = keys.split_last() else {
        return;
    };

    let mut current = document;
    for key in parents {
        let entry = current
            .entry((*key).to_string())
            .or_insert_with(|| Value::Object(Document::new()));
        if !entry.is_object() {
            *entry = Value::Object(Document::new());
        }
        current = match entry {
            Value::Object(map) => map,
            _ => unreachable!("entry was just made an object"),
        };
    }
    current.insert((*last).to_string(), value);
}
