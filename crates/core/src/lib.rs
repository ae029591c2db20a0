//! Hierarchical pipeline settings.
//!
//! Settings are resolved from three layers: defaults shipped with the code,
//! studio overrides and per-project overrides. This crate provides:
//!
//! - [`merge`] to resolve sparse override documents onto their base layer;
//! - [`environments`] to extract environment groups from resolved settings;
//! - [`schema`] to load schemas and inline their references;
//! - [`entities`], a typed tree of settings entities for editing one layer;
//! - [`store::SettingsStore`], the persistence boundary of the tree roots.

pub mod constants;
pub mod entities;
pub mod environments;
pub mod error;
pub mod files;
pub mod merge;
pub mod override_state;
pub mod schema;
pub mod store;
pub mod types;

pub use entities::{
    EntityId, EntityTree, EntityType, InputKind, LayoutItem, ProjectSettings, SettingsRoot,
    SystemSettings,
};
pub use error::{SettingsError, SettingsResult};
pub use override_state::OverrideState;
pub use store::{MemoryStore, SettingsStore};
pub use types::{Document, SettingsCategory};
