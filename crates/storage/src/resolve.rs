//! Fully resolved settings for consumers of the pipeline.
//!
//! Each helper merges the stored layers with [`apply_overrides`] and strips
//! metadata keys from the result.

use std::collections::BTreeMap;

use serde_json::Value;

use pype_settings_core::environments::{find_environments, Environment};
use pype_settings_core::merge::{apply_overrides, clear_metadata_from_document};
use pype_settings_core::{Document, SettingsCategory, SettingsError, SettingsStore};

fn category_defaults<S: SettingsStore>(
    store: &mut S,
    category: SettingsCategory,
) -> Result<Document, SettingsError> {
    match store.default_settings()?.remove(category.key()) {
        Some(Value::Object(document)) => Ok(document),
        Some(_) => {
            tracing::warn!(category = %category, "Default settings are not a dict");
            Ok(Document::new())
        }
        None => Ok(Document::new()),
    }
}

/// Defaults, studio and optional project layers of `category` merged,
/// metadata included.
fn resolve_with_metadata<S: SettingsStore>(
    store: &mut S,
    category: SettingsCategory,
    project_name: Option<&str>,
) -> Result<Document, SettingsError> {
    let defaults = category_defaults(store, category)?;
    let studio = store.studio_overrides(category)?;
    let mut resolved = apply_overrides(&defaults, &studio);
    if let Some(project_name) = project_name {
        let project = store.project_overrides(category, project_name)?;
        resolved = apply_overrides(&resolved, &project);
    }
    Ok(resolved)
}

fn resolve<S: SettingsStore>(
    store: &mut S,
    category: SettingsCategory,
    project_name: Option<&str>,
) -> Result<Document, SettingsError> {
    let mut resolved = resolve_with_metadata(store, category, project_name)?;
    clear_metadata_from_document(&mut resolved);
    Ok(resolved)
}

/// System settings with studio overrides applied.
pub fn system_settings<S: SettingsStore>(store: &mut S) -> Result<Document, SettingsError> {
    resolve(store, SettingsCategory::SystemSettings, None)
}

/// Project settings of `project_name`, or studio level settings for `None`.
pub fn project_settings<S: SettingsStore>(
    store: &mut S,
    project_name: Option<&str>,
) -> Result<Document, SettingsError> {
    resolve(store, SettingsCategory::ProjectSettings, project_name)
}

/// Project anatomy of `project_name`, or studio level anatomy for `None`.
pub fn anatomy_settings<S: SettingsStore>(
    store: &mut S,
    project_name: Option<&str>,
) -> Result<Document, SettingsError> {
    resolve(store, SettingsCategory::ProjectAnatomy, project_name)
}

/// Environment groups declared in the resolved system settings.
pub fn environments<S: SettingsStore>(
    store: &mut S,
) -> Result<BTreeMap<String, Environment>, SettingsError> {
    let resolved = resolve_with_metadata(store, SettingsCategory::SystemSettings, None)?;
    find_environments(&Value::Object(resolved))
}
