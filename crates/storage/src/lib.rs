//! File-backed persistence of pipeline settings.
//!
//! - [`JsonFileStore`] implements the core store contract on top of the
//!   defaults directory and the studio override root;
//! - [`resolve`] produces merged settings for consumers that only read;
//! - [`SettingsConfig`] locates everything from the environment.

pub mod config;
pub mod defaults;
pub mod json_file;
pub mod resolve;
pub mod store;

pub use config::SettingsConfig;
pub use defaults::DefaultSettingsCache;
pub use json_file::{load_json_file, load_jsons_from_dir, save_json_file};
pub use store::JsonFileStore;
