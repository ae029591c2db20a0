//! Root entities bound to a [`SettingsStore`].
//!
//! [`SystemSettings`] covers the `system_settings` category with defaults and
//! studio layers. [`ProjectSettings`] covers `project_settings` and
//! `project_anatomy` with all three layers.

use serde_json::Value;

use super::{EntityId, EntityTree};
use crate::environments::find_environments;
use crate::error::SettingsError;
use crate::merge::apply_overrides;
use crate::override_state::OverrideState;
use crate::store::SettingsStore;
use crate::types::{Document, SettingsCategory};

/// Operations shared by both roots.
pub trait SettingsRoot {
    fn tree(&self) -> &EntityTree;

    fn tree_mut(&mut self) -> &mut EntityTree;

    /// Reload all layers from the store and resolve them against `state`.
    ///
    /// `None` keeps the current state; [`OverrideState::NotDefined`] becomes
    /// [`OverrideState::Defaults`].
    fn reset(&mut self, state: Option<OverrideState>) -> Result<(), SettingsError>;

    /// Persist the active layer, then reset.
    fn save(&mut self) -> Result<(), SettingsError>;

    fn override_state(&self) -> OverrideState {
        self.tree().override_state()
    }

    /// Entity at a slash separated path.
    fn entity(&self, path: &str) -> Result<EntityId, SettingsError> {
        self.tree().entity_by_path(path)
    }
}

fn reset_state(requested: Option<OverrideState>, current: OverrideState) -> OverrideState {
    match requested.unwrap_or(current) {
        OverrideState::NotDefined => OverrideState::Defaults,
        state => state,
    }
}

fn as_document(value: Option<Value>) -> Document {
    match value {
        Some(Value::Object(map)) => map,
        _ => Document::new(),
    }
}

/// Write each flattened defaults key as its own file under `prefix`.
fn save_defaults<S: SettingsStore>(
    store: &mut S,
    prefix: Option<&str>,
    values: Document,
) -> Result<(), SettingsError> {
    for (key, value) in values {
        let relative_path = match prefix {
            Some(prefix) => format!("{prefix}/{key}"),
            None => key,
        };
        tracing::debug!(path = %relative_path, "Saving defaults file");
        store.save_default_file(&relative_path, &value)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// System settings
// ---------------------------------------------------------------------------

/// Root of the system settings.
#[derive(Debug)]
pub struct SystemSettings<S> {
    tree: EntityTree,
    store: S,
}

impl<S: SettingsStore> SystemSettings<S> {
    /// Build the tree without loading any layer.
    pub fn new(schema: &Value, store: S) -> Result<Self, SettingsError> {
        Ok(Self {
            tree: EntityTree::from_schema(schema)?,
            store,
        })
    }

    /// Build the tree and load it in the studio layer.
    pub fn load(schema: &Value, store: S) -> Result<Self, SettingsError> {
        let mut root = Self::new(schema, store)?;
        root.reset(Some(OverrideState::Studio))?;
        Ok(root)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Switch layers without reloading. The project layer is refused.
    pub fn set_override_state(&mut self, state: OverrideState) -> Result<(), SettingsError> {
        if state == OverrideState::Project {
            return Err(SettingsError::InvalidOverrideState(
                "System settings can't be overridden per project".to_string(),
            ));
        }
        self.tree.set_override_state(state)
    }

    fn category_defaults(&mut self) -> Result<Option<Value>, SettingsError> {
        let mut defaults = self.store.default_settings()?;
        Ok(defaults.remove(SettingsCategory::SystemSettings.key()))
    }
}

impl<S: SettingsStore> SettingsRoot for SystemSettings<S> {
    fn tree(&self) -> &EntityTree {
        &self.tree
    }

    fn tree_mut(&mut self) -> &mut EntityTree {
        &mut self.tree
    }

    fn reset(&mut self, state: Option<OverrideState>) -> Result<(), SettingsError> {
        let state = reset_state(state, self.tree.override_state());
        if state == OverrideState::Project {
            return Err(SettingsError::InvalidOverrideState(
                "System settings can't be overridden per project".to_string(),
            ));
        }

        let defaults = self.category_defaults()?;
        let studio = self.store.studio_overrides(SettingsCategory::SystemSettings)?;

        let root = self.tree.root();
        self.tree.update_default_value(root, defaults);
        self.tree.update_studio_value(root, Some(Value::Object(studio)));
        self.tree.update_project_value(root, None);
        self.tree.set_override_state(state)?;
        self.tree.notify();
        Ok(())
    }

    fn save(&mut self) -> Result<(), SettingsError> {
        let state = self.tree.override_state();
        let value = as_document(self.tree.settings_value(self.tree.root()));
        match state {
            OverrideState::Defaults => {
                find_environments(&Value::Object(value.clone()))?;
                save_defaults(
                    &mut self.store,
                    Some(SettingsCategory::SystemSettings.key()),
                    value,
                )?;
            }
            OverrideState::Studio => {
                let defaults = as_document(self.category_defaults()?);
                let resolved = apply_overrides(&defaults, &value);
                find_environments(&Value::Object(resolved))?;
                self.store
                    .save_studio_overrides(SettingsCategory::SystemSettings, &value)?;
            }
            other => {
                return Err(SettingsError::InvalidOverrideState(format!(
                    "System settings can't be saved in {other} state"
                )))
            }
        }
        tracing::info!(state = %state, "Saved system settings");
        self.reset(None)
    }
}

// ---------------------------------------------------------------------------
// Project settings
// ---------------------------------------------------------------------------

/// Root of the project settings and project anatomy.
#[derive(Debug)]
pub struct ProjectSettings<S> {
    tree: EntityTree,
    store: S,
    project_name: Option<String>,
}

impl<S: SettingsStore> ProjectSettings<S> {
    /// Build the tree without loading any layer.
    ///
    /// Every child of the root must be a project category.
    pub fn new(schema: &Value, store: S) -> Result<Self, SettingsError> {
        let tree = EntityTree::from_schema(schema)?;
        for child in tree.children(tree.root()) {
            let key = tree.key(child).unwrap_or_default();
            let valid = SettingsCategory::from_key(key).is_some_and(SettingsCategory::has_project_layer);
            if !valid {
                return Err(SettingsError::schema(
                    key,
                    "Project settings root may contain only project categories",
                ));
            }
        }
        Ok(Self {
            tree,
            store,
            project_name: None,
        })
    }

    /// Build the tree and load it for `project_name`, or in the studio layer
    /// when no project is given.
    pub fn load(schema: &Value, store: S, project_name: Option<&str>) -> Result<Self, SettingsError> {
        let mut root = Self::new(schema, store)?;
        root.project_name = project_name.map(str::to_string);
        let state = if root.project_name.is_some() {
            OverrideState::Project
        } else {
            OverrideState::Studio
        };
        root.reset(Some(state))?;
        Ok(root)
    }

    pub fn project_name(&self) -> Option<&str> {
        self.project_name.as_deref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Load another project. Without a project the project layer falls back
    /// to the studio layer.
    pub fn change_project(&mut self, project_name: Option<&str>) -> Result<(), SettingsError> {
        let mut state = self.tree.override_state();
        if project_name.is_none() && state == OverrideState::Project {
            state = OverrideState::Studio;
        }
        self.project_name = project_name.map(str::to_string);
        self.reset(Some(state))
    }

    /// Switch layers without reloading.
    pub fn set_override_state(&mut self, state: OverrideState) -> Result<(), SettingsError> {
        self.check_project_state(state)?;
        self.tree.set_override_state(state)
    }

    fn check_project_state(&self, state: OverrideState) -> Result<(), SettingsError> {
        if state == OverrideState::Project && self.project_name.is_none() {
            return Err(SettingsError::InvalidOverrideState(
                "Project layer requires a project name".to_string(),
            ));
        }
        Ok(())
    }

    fn categories(&self) -> Vec<SettingsCategory> {
        self.tree
            .children(self.tree.root())
            .into_iter()
            .filter_map(|child| SettingsCategory::from_key(self.tree.key(child)?))
            .collect()
    }
}

impl<S: SettingsStore> SettingsRoot for ProjectSettings<S> {
    fn tree(&self) -> &EntityTree {
        &self.tree
    }

    fn tree_mut(&mut self) -> &mut EntityTree {
        &mut self.tree
    }

    fn reset(&mut self, state: Option<OverrideState>) -> Result<(), SettingsError> {
        let state = reset_state(state, self.tree.override_state());
        self.check_project_state(state)?;

        let categories = self.categories();
        let mut all_defaults = self.store.default_settings()?;
        let mut defaults = Document::new();
        let mut studio = Document::new();
        let mut project = Document::new();
        for category in categories {
            let key = category.key().to_string();
            if let Some(value) = all_defaults.remove(&key) {
                defaults.insert(key.clone(), value);
            }
            let overrides = self.store.studio_overrides(category)?;
            studio.insert(key.clone(), Value::Object(overrides));
            if let Some(project_name) = &self.project_name {
                let overrides = self.store.project_overrides(category, project_name)?;
                project.insert(key, Value::Object(overrides));
            }
        }

        let root = self.tree.root();
        self.tree.update_default_value(root, Some(Value::Object(defaults)));
        self.tree.update_studio_value(root, Some(Value::Object(studio)));
        let project = self.project_name.is_some().then_some(Value::Object(project));
        self.tree.update_project_value(root, project);
        self.tree.set_override_state(state)?;
        self.tree.notify();
        Ok(())
    }

    fn save(&mut self) -> Result<(), SettingsError> {
        let state = self.tree.override_state();
        let mut value = as_document(self.tree.settings_value(self.tree.root()));
        match state {
            OverrideState::Defaults => save_defaults(&mut self.store, None, value)?,
            OverrideState::Studio => {
                for category in self.categories() {
                    let overrides = as_document(value.remove(category.key()));
                    self.store.save_studio_overrides(category, &overrides)?;
                }
            }
            OverrideState::Project => {
                let project_name = self.project_name.clone().ok_or_else(|| {
                    SettingsError::InvalidOverrideState("Project layer requires a project name".to_string())
                })?;
                for category in self.categories() {
                    let overrides = as_document(value.remove(category.key()));
                    self.store
                        .save_project_overrides(category, &project_name, &overrides)?;
                }
            }
            OverrideState::NotDefined => {
                return Err(SettingsError::InvalidOverrideState(
                    "Project settings can't be saved in not defined state".to_string(),
                ))
            }
        }
        tracing::info!(
            state = %state,
            project = self.project_name.as_deref().unwrap_or(""),
            "Saved project settings",
        );
        self.reset(None)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::store::MemoryStore;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn system_schema() -> Value {
        json!({"children": [
            {"type": "dict", "key": "general", "is_file": true, "children": [
                {"type": "text", "key": "studio_name"}
            ]}
        ]})
    }

    fn project_schema() -> Value {
        json!({"children": [
            {"type": "dict", "key": "project_settings", "children": [
                {"type": "dict", "key": "global", "is_file": true, "children": [
                    {"type": "number", "key": "fps", "decimal": 3}
                ]}
            ]},
            {"type": "dict", "key": "project_anatomy", "is_file": true, "children": [
                {"type": "text", "key": "root"}
            ]}
        ]})
    }

    fn project_store() -> MemoryStore {
        MemoryStore::new(doc(json!({
            "project_settings": {"global": {"fps": 25}},
            "project_anatomy": {"root": "/mnt/projects"}
        })))
    }

    // -- system --

    #[test]
    fn test_system_rejects_project_state() {
        let store = MemoryStore::new(doc(json!({"system_settings": {"general": {"studio_name": "Acme"}}})));
        let mut root = SystemSettings::load(&system_schema(), store).unwrap();
        assert_matches!(
            root.set_override_state(OverrideState::Project),
            Err(SettingsError::InvalidOverrideState(_))
        );
        assert_matches!(
            root.reset(Some(OverrideState::Project)),
            Err(SettingsError::InvalidOverrideState(_))
        );
    }

    #[test]
    fn test_first_reset_uses_defaults() {
        let store = MemoryStore::new(doc(json!({"system_settings": {"general": {"studio_name": "Acme"}}})));
        let mut root = SystemSettings::new(&system_schema(), store).unwrap();
        root.reset(None).unwrap();
        assert_eq!(root.override_state(), OverrideState::Defaults);
    }

    #[test]
    fn test_studio_without_defaults_fails() {
        let store = MemoryStore::new(Document::new());
        let err = SystemSettings::load(&system_schema(), store).unwrap_err();
        assert_matches!(err, SettingsError::DefaultsNotDefined(ref path) if path == "general/studio_name");
    }

    // -- project --

    #[test]
    fn test_project_state_requires_project_name() {
        let mut root = ProjectSettings::load(&project_schema(), project_store(), None).unwrap();
        assert_eq!(root.override_state(), OverrideState::Studio);
        assert_matches!(
            root.set_override_state(OverrideState::Project),
            Err(SettingsError::InvalidOverrideState(_))
        );
    }

    #[test]
    fn test_project_save_writes_each_category() {
        let mut root = ProjectSettings::load(&project_schema(), project_store(), Some("alpha")).unwrap();
        let fps = root.entity("project_settings/global/fps").unwrap();
        root.tree_mut().set(fps, json!(24)).unwrap();
        root.save().unwrap();

        let store = root.store();
        assert_eq!(
            Value::Object(store.projects[&("alpha".to_string(), SettingsCategory::ProjectSettings)].clone()),
            json!({"global": {"fps": 24, "__overriden_keys__": ["fps"]}})
        );
        assert!(store.projects[&("alpha".to_string(), SettingsCategory::ProjectAnatomy)].is_empty());
        assert!(root.tree().is_overridden(fps));
    }

    #[test]
    fn test_change_project_without_name_falls_back_to_studio() {
        let mut root = ProjectSettings::load(&project_schema(), project_store(), Some("alpha")).unwrap();
        root.change_project(None).unwrap();
        assert_eq!(root.override_state(), OverrideState::Studio);
        assert_eq!(root.project_name(), None);
    }

    #[test]
    fn test_project_defaults_are_saved_per_file() {
        let mut root = ProjectSettings::load(&project_schema(), project_store(), None).unwrap();
        root.reset(Some(OverrideState::Defaults)).unwrap();
        root.save().unwrap();
        let mut saved = root.store().saved_default_files.clone();
        saved.sort();
        assert_eq!(saved, vec!["project_anatomy", "project_settings/global"]);
    }

    #[test]
    fn test_non_project_root_child_fails() {
        let err = ProjectSettings::new(&system_schema(), MemoryStore::default()).unwrap_err();
        assert_matches!(err, SettingsError::SchemaError { ref path, .. } if path == "general");
    }
}
