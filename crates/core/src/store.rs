//! Persistence boundary of the settings roots.
//!
//! Roots read their three layers and write the active one through
//! [`SettingsStore`]. The file layout lives in the storage crate;
//! [`MemoryStore`] keeps everything in memory for tests and embedding.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::SettingsError;
use crate::merge::subkey_merge;
use crate::types::{Document, SettingsCategory};

/// Source and sink of stored settings layers.
pub trait SettingsStore {
    /// Full defaults tree keyed by category key.
    fn default_settings(&mut self) -> Result<Document, SettingsError>;

    /// Write one defaults file; `relative_path` is slash separated without
    /// extension, starting with the category key.
    fn save_default_file(&mut self, relative_path: &str, value: &Value) -> Result<(), SettingsError>;

    /// Studio overrides of `category`, empty when none are stored.
    fn studio_overrides(&mut self, category: SettingsCategory) -> Result<Document, SettingsError>;

    fn save_studio_overrides(
        &mut self,
        category: SettingsCategory,
        overrides: &Document,
    ) -> Result<(), SettingsError>;

    /// Overrides of `project_name` for `category`, empty when none are stored.
    fn project_overrides(
        &mut self,
        category: SettingsCategory,
        project_name: &str,
    ) -> Result<Document, SettingsError>;

    fn save_project_overrides(
        &mut self,
        category: SettingsCategory,
        project_name: &str,
        overrides: &Document,
    ) -> Result<(), SettingsError>;
}

/// In-memory [`SettingsStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub defaults: Document,
    pub studio: HashMap<SettingsCategory, Document>,
    pub projects: HashMap<(String, SettingsCategory), Document>,
    /// Relative paths passed to [`SettingsStore::save_default_file`], in
    /// call order.
    pub saved_default_files: Vec<String>,
}

impl MemoryStore {
    pub fn new(defaults: Document) -> Self {
        Self {
            defaults,
            ..Self::default()
        }
    }

    pub fn with_studio(mut self, category: SettingsCategory, overrides: Document) -> Self {
        self.studio.insert(category, overrides);
        self
    }

    pub fn with_project(mut self, category: SettingsCategory, project_name: &str, overrides: Document) -> Self {
        self.projects.insert((project_name.to_string(), category), overrides);
        self
    }
}

impl SettingsStore for MemoryStore {
    fn default_settings(&mut self) -> Result<Document, SettingsError> {
        Ok(self.defaults.clone())
    }

    fn save_default_file(&mut self, relative_path: &str, value: &Value) -> Result<(), SettingsError> {
        let keys: Vec<&str> = relative_path.split('/').collect();
        subkey_merge(&mut self.defaults, value.clone(), &keys);
        self.saved_default_files.push(relative_path.to_string());
        Ok(())
    }

    fn studio_overrides(&mut self, category: SettingsCategory) -> Result<Document, SettingsError> {
        Ok(self.studio.get(&category).cloned().unwrap_or_default())
    }

    fn save_studio_overrides(
        &mut self,
        category: SettingsCategory,
        overrides: &Document,
    ) -> Result<(), SettingsError> {
        self.studio.insert(category, overrides.clone());
        Ok(())
    }

    fn project_overrides(
        &mut self,
        category: SettingsCategory,
        project_name: &str,
    ) -> Result<Document, SettingsError> {
        Ok(self
            .projects
            .get(&(project_name.to_string(), category))
            .cloned()
            .unwrap_or_default())
    }

    fn save_project_overrides(
        &mut self,
        category: SettingsCategory,
        project_name: &str,
        overrides: &Document,
    ) -> Result<(), SettingsError> {
        self.projects
            .insert((project_name.to_string(), category), overrides.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_save_default_file_merges_by_path() {
        let mut store = MemoryStore::new(
            json!({"system_settings": {"general": {"studio_name": "Acme"}}})
                .as_object()
                .cloned()
                .unwrap(),
        );
        store
            .save_default_file("system_settings/applications/maya", &json!({"enabled": true}))
            .unwrap();
        let defaults = store.default_settings().unwrap();
        assert_eq!(
            defaults["system_settings"],
            json!({
                "general": {"studio_name": "Acme"},
                "applications": {"maya": {"enabled": true}}
            })
        );
        assert_eq!(store.saved_default_files, vec!["system_settings/applications/maya"]);
    }

    #[test]
    fn test_missing_overrides_are_empty() {
        let mut store = MemoryStore::default();
        assert!(store.studio_overrides(SettingsCategory::SystemSettings).unwrap().is_empty());
        assert!(store
            .project_overrides(SettingsCategory::ProjectAnatomy, "alpha")
            .unwrap()
            .is_empty());
    }
}
