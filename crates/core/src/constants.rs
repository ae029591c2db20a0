//! Reserved keys shared by stored documents, schemas and the entity tree.

use std::sync::LazyLock;

use regex::Regex;

// ---------------------------------------------------------------------------
// Metadata keys
// ---------------------------------------------------------------------------

/// Lists the keys of a dict level that are explicit overrides.
pub const M_OVERRIDEN_KEY: &str = "__overriden_keys__";

/// Maps environment group key to the variable names stored next to it.
pub const M_ENVIRONMENT_KEY: &str = "__environment_keys__";

/// Display labels of keys in a dict with mutable keys.
pub const M_DYNAMIC_KEY_LABEL: &str = "__dynamic_keys_labels__";

/// Override value that removes the key from the base document.
pub const M_POP_KEY: &str = "__pop_key__";

/// Keys that never belong to the value namespace of a document.
pub const METADATA_KEYS: &[&str] = &[M_OVERRIDEN_KEY, M_ENVIRONMENT_KEY, M_DYNAMIC_KEY_LABEL];

// ---------------------------------------------------------------------------
// Category keys
// ---------------------------------------------------------------------------

pub const SYSTEM_SETTINGS_KEY: &str = "system_settings";
pub const PROJECT_SETTINGS_KEY: &str = "project_settings";
pub const PROJECT_ANATOMY_KEY: &str = "project_anatomy";

// ---------------------------------------------------------------------------
// Schema types
// ---------------------------------------------------------------------------

/// Schema types whose children merge into the parent's namespace.
pub const WRAPPER_TYPES: &[&str] = &["form", "collapsible-wrap"];

/// Schema types rendered by the GUI only; they hold no value.
pub const GUI_TYPES: &[&str] = &["label", "separator", "divider", "splitter"];

/// Platforms of a multiplatform path entity.
pub const PATH_PLATFORMS: &[&str] = &["windows", "darwin", "linux"];

// ---------------------------------------------------------------------------
// Mutable keys
// ---------------------------------------------------------------------------

/// Symbols allowed in keys of a dict with mutable keys.
pub const KEY_ALLOWED_SYMBOLS: &str = "a-zA-Z0-9_ -";

pub static KEY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^[{KEY_ALLOWED_SYMBOLS}]+$")).expect("valid regex")
});

/// Returns `true` if `key` is a metadata key.
pub fn is_metadata_key(key: &str) -> bool {
    METADATA_KEYS.contains(&key)
}
