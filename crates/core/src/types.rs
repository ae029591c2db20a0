use serde::{Deserialize, Serialize};

use crate::constants::{PROJECT_ANATOMY_KEY, PROJECT_SETTINGS_KEY, SYSTEM_SETTINGS_KEY};

/// Every settings document is a JSON object.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// The three stored settings categories.
///
/// Each category owns one defaults subdirectory and one override file per
/// studio (and per project for the project categories).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingsCategory {
    SystemSettings,
    ProjectSettings,
    ProjectAnatomy,
}

impl SettingsCategory {
    pub const ALL: [SettingsCategory; 3] = [
        SettingsCategory::SystemSettings,
        SettingsCategory::ProjectSettings,
        SettingsCategory::ProjectAnatomy,
    ];

    /// Key of the category in the defaults tree and its override file stem.
    pub fn key(self) -> &'static str {
        match self {
            SettingsCategory::SystemSettings => SYSTEM_SETTINGS_KEY,
            SettingsCategory::ProjectSettings => PROJECT_SETTINGS_KEY,
            SettingsCategory::ProjectAnatomy => PROJECT_ANATOMY_KEY,
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.key() == key)
    }

    /// Whether the category has a per-project override layer.
    pub fn has_project_layer(self) -> bool {
        !matches!(self, SettingsCategory::SystemSettings)
    }
}

impl std::fmt::Display for SettingsCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_keys_round_trip() {
        for category in SettingsCategory::ALL {
            assert_eq!(SettingsCategory::from_key(category.key()), Some(category));
        }
        assert_eq!(SettingsCategory::from_key("local_settings"), None);
    }

    #[test]
    fn test_only_project_categories_have_project_layer() {
        assert!(!SettingsCategory::SystemSettings.has_project_layer());
        assert!(SettingsCategory::ProjectSettings.has_project_layer());
        assert!(SettingsCategory::ProjectAnatomy.has_project_layer());
    }
}
