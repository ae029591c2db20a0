use clap::{Parser, Subcommand, ValueEnum};

use pype_settings_core::OverrideState;

/// Inspect and edit pipeline settings.
#[derive(Debug, Parser)]
#[command(name = "pype-settings", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print resolved system settings.
    System,
    /// Print resolved project settings.
    Project {
        /// Project name; studio level settings when omitted.
        name: Option<String>,
    },
    /// Print resolved project anatomy.
    Anatomy {
        /// Project name; studio level anatomy when omitted.
        name: Option<String>,
    },
    /// Print environment groups of the system settings.
    Environments,
    /// Build both settings trees and report schema or data problems.
    Validate,
    /// Print the value of one entity as seen from a layer.
    Get {
        /// Slash separated path starting with the category key,
        /// e.g. `system_settings/general/studio_name`.
        path: String,
        #[arg(long, value_enum, default_value_t = Layer::Studio)]
        layer: Layer,
        /// Project to load for the project layer.
        #[arg(long)]
        project: Option<String>,
    },
    /// Set the value of one entity in a layer and save it.
    Set {
        path: String,
        /// New value as JSON.
        value: String,
        #[arg(long, value_enum, default_value_t = Layer::Studio)]
        layer: Layer,
        #[arg(long)]
        project: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Layer {
    Defaults,
    Studio,
    Project,
}

impl From<Layer> for OverrideState {
    fn from(layer: Layer) -> Self {
        match layer {
            Layer::Defaults => OverrideState::Defaults,
            Layer::Studio => OverrideState::Studio,
            Layer::Project => OverrideState::Project,
        }
    }
}
