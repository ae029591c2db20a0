use std::path::PathBuf;

/// Filesystem locations of the settings layers.
///
/// Defaults are relative to the working directory, which suits running the
/// tools from a pipeline checkout. Studios point them elsewhere through the
/// environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsConfig {
    /// Root of the studio and project override files.
    pub studio_root: PathBuf,
    /// Root of the defaults tree shipped with the pipeline.
    pub defaults_dir: PathBuf,
    /// Directory holding `system_schema/` and `projects_schema/`.
    pub schemas_dir: PathBuf,
}

impl SettingsConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default             |
    /// |--------------------------|---------------------|
    /// | `PYPE_PROJECT_CONFIGS`   | `./studio_settings` |
    /// | `PYPE_SETTINGS_DEFAULTS` | `./defaults`        |
    /// | `PYPE_SETTINGS_SCHEMAS`  | `./schemas`         |
    pub fn from_env() -> Self {
        let studio_root = std::env::var("PYPE_PROJECT_CONFIGS")
            .unwrap_or_else(|_| "./studio_settings".into())
            .into();
        let defaults_dir = std::env::var("PYPE_SETTINGS_DEFAULTS")
            .unwrap_or_else(|_| "./defaults".into())
            .into();
        let schemas_dir = std::env::var("PYPE_SETTINGS_SCHEMAS")
            .unwrap_or_else(|_| "./schemas".into())
            .into();

        Self {
            studio_root,
            defaults_dir,
            schemas_dir,
        }
    }

    /// Configuration rooted in one directory, laid out as
    /// `<root>/{studio_settings,defaults,schemas}`.
    pub fn in_dir(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            studio_root: root.join("studio_settings"),
            defaults_dir: root.join("defaults"),
            schemas_dir: root.join("schemas"),
        }
    }
}
