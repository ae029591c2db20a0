use anyhow::{bail, Context};
use serde_json::Value;

use pype_settings_core::constants::{PROJECT_ANATOMY_KEY, PROJECT_SETTINGS_KEY, SYSTEM_SETTINGS_KEY};
use pype_settings_core::schema::{gui_schema, PROJECT_SCHEMA_DIR, SYSTEM_SCHEMA_DIR};
use pype_settings_core::{OverrideState, ProjectSettings, SettingsRoot, SystemSettings};
use pype_settings_storage::{resolve, JsonFileStore, SettingsConfig};

use crate::cli::Command;

pub fn run(command: Command, config: &SettingsConfig) -> anyhow::Result<()> {
    let mut store = JsonFileStore::new(config);
    match command {
        Command::System => print_json(&Value::Object(resolve::system_settings(&mut store)?)),
        Command::Project { name } => print_json(&Value::Object(resolve::project_settings(
            &mut store,
            name.as_deref(),
        )?)),
        Command::Anatomy { name } => print_json(&Value::Object(resolve::anatomy_settings(
            &mut store,
            name.as_deref(),
        )?)),
        Command::Environments => {
            let environments = resolve::environments(&mut store)?;
            print_json(&serde_json::to_value(environments)?)
        }
        Command::Validate => validate(config),
        Command::Get {
            path,
            layer,
            project,
        } => {
            let value = match split_target(&path)? {
                Target::System(path) => get(&load_system(config, layer.into())?, path)?,
                Target::Project(path) => {
                    get(&load_project(config, layer.into(), project.as_deref())?, path)?
                }
            };
            print_json(&value)
        }
        Command::Set {
            path,
            value,
            layer,
            project,
        } => {
            let value: Value =
                serde_json::from_str(&value).with_context(|| format!("Invalid JSON value: {value}"))?;
            match split_target(&path)? {
                Target::System(path) => set(&mut load_system(config, layer.into())?, path, value)?,
                Target::Project(path) => set(
                    &mut load_project(config, layer.into(), project.as_deref())?,
                    path,
                    value,
                )?,
            }
            tracing::info!(path = %path, layer = ?layer, "Setting saved");
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Roots
// ---------------------------------------------------------------------------

/// Root a settings path belongs to, with the path inside that root.
#[derive(Debug)]
enum Target<'a> {
    System(&'a str),
    Project(&'a str),
}

fn split_target(path: &str) -> anyhow::Result<Target<'_>> {
    let path = path.trim_matches('/');
    let (category, rest) = path.split_once('/').unwrap_or((path, ""));
    match category {
        SYSTEM_SETTINGS_KEY => Ok(Target::System(rest)),
        PROJECT_SETTINGS_KEY | PROJECT_ANATOMY_KEY => Ok(Target::Project(path)),
        other => bail!("Unknown settings category \"{other}\""),
    }
}

fn load_system(
    config: &SettingsConfig,
    state: OverrideState,
) -> anyhow::Result<SystemSettings<JsonFileStore>> {
    let schema = gui_schema(&config.schemas_dir, SYSTEM_SCHEMA_DIR)?;
    let mut root = SystemSettings::new(&schema, JsonFileStore::new(config))?;
    root.reset(Some(state))?;
    Ok(root)
}

fn load_project(
    config: &SettingsConfig,
    state: OverrideState,
    project: Option<&str>,
) -> anyhow::Result<ProjectSettings<JsonFileStore>> {
    if state == OverrideState::Project && project.is_none() {
        bail!("The project layer requires --project");
    }
    let schema = gui_schema(&config.schemas_dir, PROJECT_SCHEMA_DIR)?;
    let mut root = ProjectSettings::new(&schema, JsonFileStore::new(config))?;
    root.change_project(project)?;
    root.reset(Some(state))?;
    Ok(root)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn get<R: SettingsRoot>(root: &R, path: &str) -> anyhow::Result<Value> {
    let tree = root.tree();
    let id = if path.is_empty() {
        tree.root()
    } else {
        root.entity(path)?
    };
    Ok(tree.value(id))
}

fn set<R: SettingsRoot>(root: &mut R, path: &str, value: Value) -> anyhow::Result<()> {
    let id = root.entity(path)?;
    root.tree_mut().set(id, value)?;
    root.save()?;
    Ok(())
}

fn validate(config: &SettingsConfig) -> anyhow::Result<()> {
    load_system(config, OverrideState::Studio).context("System settings are invalid")?;
    tracing::info!("System settings are valid");

    load_project(config, OverrideState::Studio, None).context("Project settings are invalid")?;
    tracing::info!("Project settings are valid");

    let mut store = JsonFileStore::new(config);
    let environments = resolve::environments(&mut store).context("Environment groups are invalid")?;
    tracing::info!(groups = environments.len(), "Environment groups are valid");

    println!("Settings are valid");
    Ok(())
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_split_target() {
        assert_matches!(
            split_target("system_settings/general/studio_name"),
            Ok(Target::System("general/studio_name"))
        );
        assert_matches!(split_target("system_settings"), Ok(Target::System("")));
        assert_matches!(
            split_target("/project_anatomy/roots/"),
            Ok(Target::Project("project_anatomy/roots"))
        );
        assert!(split_target("local_settings/x").is_err());
    }
}
