//! Lazily loaded defaults tree.

use std::path::{Path, PathBuf};

use pype_settings_core::{Document, SettingsError};

use crate::json_file::load_jsons_from_dir;

/// Defaults tree read from disk on first use and kept until invalidated.
#[derive(Debug)]
pub struct DefaultSettingsCache {
    dir: PathBuf,
    cached: Option<Document>,
}

impl DefaultSettingsCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cached: None,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The defaults tree, loading it when nothing is cached.
    pub fn get(&mut self) -> Result<&Document, SettingsError> {
        if self.cached.is_none() {
            self.reload()?;
        }
        Ok(self.cached.get_or_insert_with(Document::new))
    }

    /// Drop the cached tree; the next [`get`](Self::get) reads the disk.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Read the defaults tree again.
    pub fn reload(&mut self) -> Result<(), SettingsError> {
        let document = load_jsons_from_dir(&self.dir)?;
        tracing::debug!(path = %self.dir.display(), keys = document.len(), "Loaded default settings");
        self.cached = Some(document);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.cached.is_some()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::json_file::save_json_file;

    #[test]
    fn test_cache_until_invalidated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("system_settings/general.json");
        save_json_file(&path, &json!({"studio_name": "Acme"})).unwrap();

        let mut cache = DefaultSettingsCache::new(dir.path());
        assert!(!cache.is_loaded());
        assert_eq!(
            cache.get().unwrap()["system_settings"]["general"]["studio_name"],
            json!("Acme")
        );

        save_json_file(&path, &json!({"studio_name": "Beta"})).unwrap();
        assert_eq!(
            cache.get().unwrap()["system_settings"]["general"]["studio_name"],
            json!("Acme")
        );

        cache.invalidate();
        assert!(!cache.is_loaded());
        assert_eq!(
            cache.get().unwrap()["system_settings"]["general"]["studio_name"],
            json!("Beta")
        );
    }
}
