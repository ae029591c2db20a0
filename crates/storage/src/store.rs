//! [`SettingsStore`] backed by JSON files.

use std::path::PathBuf;

use serde_json::Value;

use pype_settings_core::files::JSON_EXTENSION;
use pype_settings_core::{Document, SettingsCategory, SettingsError, SettingsStore};

use crate::config::SettingsConfig;
use crate::defaults::DefaultSettingsCache;
use crate::json_file::{load_json_file, save_json_file};

/// Settings files on disk.
///
/// Layout:
/// - defaults: `<defaults_dir>/<category>/<key path>.json`
/// - studio overrides: `<studio_root>/<category>.json`
/// - project overrides: `<studio_root>/<project>/<category>.json`
#[derive(Debug)]
pub struct JsonFileStore {
    studio_root: PathBuf,
    defaults: DefaultSettingsCache,
}

impl JsonFileStore {
    pub fn new(config: &SettingsConfig) -> Self {
        Self {
            studio_root: config.studio_root.clone(),
            defaults: DefaultSettingsCache::new(&config.defaults_dir),
        }
    }

    pub fn studio_overrides_path(&self, category: SettingsCategory) -> PathBuf {
        self.studio_root
            .join(format!("{}.{JSON_EXTENSION}", category.key()))
    }

    pub fn project_overrides_path(&self, category: SettingsCategory, project_name: &str) -> PathBuf {
        self.studio_root
            .join(project_name)
            .join(format!("{}.{JSON_EXTENSION}", category.key()))
    }

    /// Drop cached defaults so the next read goes to disk.
    pub fn invalidate_defaults(&mut self) {
        self.defaults.invalidate();
    }
}

fn check_project_category(category: SettingsCategory) -> Result<(), SettingsError> {
    if category.has_project_layer() {
        Ok(())
    } else {
        Err(SettingsError::InvalidOverrideState(format!(
            "{category} has no project overrides"
        )))
    }
}

impl SettingsStore for JsonFileStore {
    fn default_settings(&mut self) -> Result<Document, SettingsError> {
        self.defaults.get().cloned()
    }

    fn save_default_file(&mut self, relative_path: &str, value: &Value) -> Result<(), SettingsError> {
        let path = self
            .defaults
            .dir()
            .join(format!("{relative_path}.{JSON_EXTENSION}"));
        save_json_file(&path, value)?;
        self.defaults.invalidate();
        tracing::info!(file = %relative_path, "Saved default settings file");
        Ok(())
    }

    fn studio_overrides(&mut self, category: SettingsCategory) -> Result<Document, SettingsError> {
        load_json_file(&self.studio_overrides_path(category))
    }

    fn save_studio_overrides(
        &mut self,
        category: SettingsCategory,
        overrides: &Document,
    ) -> Result<(), SettingsError> {
        let path = self.studio_overrides_path(category);
        save_json_file(&path, &Value::Object(overrides.clone()))?;
        tracing::info!(category = %category, path = %path.display(), "Saved studio overrides");
        Ok(())
    }

    fn project_overrides(
        &mut self,
        category: SettingsCategory,
        project_name: &str,
    ) -> Result<Document, SettingsError> {
        check_project_category(category)?;
        load_json_file(&self.project_overrides_path(category, project_name))
    }

    fn save_project_overrides(
        &mut self,
        category: SettingsCategory,
        project_name: &str,
        overrides: &Document,
    ) -> Result<(), SettingsError> {
        check_project_category(category)?;
        let path = self.project_overrides_path(category, project_name);
        save_json_file(&path, &Value::Object(overrides.clone()))?;
        tracing::info!(
            category = %category,
            project = %project_name,
            path = %path.display(),
            "Saved project overrides",
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn store() -> (tempfile::TempDir, JsonFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(&SettingsConfig::in_dir(dir.path()));
        (dir, store)
    }

    #[test]
    fn test_paths_follow_layout() {
        let (dir, store) = store();
        assert_eq!(
            store.studio_overrides_path(SettingsCategory::SystemSettings),
            dir.path().join("studio_settings/system_settings.json")
        );
        assert_eq!(
            store.project_overrides_path(SettingsCategory::ProjectAnatomy, "alpha"),
            dir.path().join("studio_settings/alpha/project_anatomy.json")
        );
    }

    #[test]
    fn test_save_default_file_invalidates_cache() {
        let (dir, mut store) = store();
        assert!(store.default_settings().unwrap().is_empty());

        store
            .save_default_file("system_settings/applications/maya", &json!({"enabled": true}))
            .unwrap();
        assert!(dir.path().join("defaults/system_settings/applications/maya.json").is_file());
        assert_eq!(
            store.default_settings().unwrap()["system_settings"]["applications"]["maya"],
            json!({"enabled": true})
        );
    }

    #[test]
    fn test_system_settings_have_no_project_layer() {
        let (_dir, mut store) = store();
        assert_matches!(
            store.project_overrides(SettingsCategory::SystemSettings, "alpha"),
            Err(SettingsError::InvalidOverrideState(_))
        );
    }

    #[test]
    fn test_overrides_round_trip() {
        let (_dir, mut store) = store();
        let overrides = json!({"global": {"fps": 24, "__overriden_keys__": ["fps"]}})
            .as_object()
            .cloned()
            .unwrap();
        store
            .save_project_overrides(SettingsCategory::ProjectSettings, "alpha", &overrides)
            .unwrap();
        assert_eq!(
            store
                .project_overrides(SettingsCategory::ProjectSettings, "alpha")
                .unwrap(),
            overrides
        );
        assert!(store
            .project_overrides(SettingsCategory::ProjectSettings, "beta")
            .unwrap()
            .is_empty());
    }
}
