//! Directory walking shared by the schema loader and the defaults loader.

use std::path::{Path, PathBuf};

use crate::error::SettingsError;

/// Extension of every schema, defaults and override file.
pub const JSON_EXTENSION: &str = "json";

/// Recursively collect `.json` files under `root`.
///
/// Returned paths are relative to `root` and sorted so loading order is
/// stable. Hidden entries are skipped.
pub fn collect_json_files(root: &Path) -> Result<Vec<PathBuf>, SettingsError> {
    let mut files = Vec::new();
    collect_recursive(root, root, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_recursive(root: &Path, current: &Path, files: &mut Vec<PathBuf>) -> Result<(), SettingsError> {
    let entries = std::fs::read_dir(current).map_err(|e| SettingsError::io(current, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| SettingsError::io(current, e))?;
        let path = entry.path();
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }

        if path.is_dir() {
            collect_recursive(root, &path, files)?;
        } else if path.extension().is_some_and(|ext| ext == JSON_EXTENSION) {
            let relative = path.strip_prefix(root).unwrap_or(&path);
            files.push(relative.to_path_buf());
        }
    }
    Ok(())
}

/// Path segments of a relative file path without the `.json` extension.
///
/// `applications/maya.json` → `["applications", "maya"]`.
pub fn key_path_segments(relative: &Path) -> Vec<String> {
    let mut segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    if let (Some(last), Some(stem)) = (segments.last_mut(), relative.file_stem()) {
        *last = stem.to_string_lossy().to_string();
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_json_files_is_sorted_and_relative() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("b/nested")).unwrap();
        std::fs::write(dir.path().join("b/nested/z.json"), "{}").unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        std::fs::write(dir.path().join(".hidden.json"), "{}").unwrap();

        let files = collect_json_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![PathBuf::from("a.json"), PathBuf::from("b/nested/z.json")]
        );
    }

    #[test]
    fn test_key_path_segments() {
        assert_eq!(
            key_path_segments(Path::new("applications/maya.json")),
            vec!["applications", "maya"]
        );
        assert_eq!(key_path_segments(Path::new("general.json")), vec!["general"]);
    }

    #[test]
    fn test_missing_root_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = collect_json_files(&dir.path().join("missing"));
        assert!(matches!(result, Err(SettingsError::Io { .. })));
    }
}
