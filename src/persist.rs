//! Writing store settings into TOML files while preserving formatting.
//!
//! Uses `toml_edit` so comments and layout of an existing file survive.
//! Creates parent directories as needed.

use std::path::Path;

use toml::Table;

use crate::error::FlagbindError;
use crate::path::{get_path, leaf_keys};

/// Pure function: set every leaf of `settings` in the document `content`.
///
/// `path` is only used in error messages.
pub fn set_in_document(
    content: &str,
    settings: &Table,
    path: &Path,
) -> Result<String, FlagbindError> {
    let invalid = |reason: String| FlagbindError::InvalidDocument {
        path: path.to_path_buf(),
        reason,
    };

    let mut doc: toml_edit::DocumentMut = content
        .parse()
        .map_err(|e: toml_edit::TomlError| invalid(e.to_string()))?;

    for key in leaf_keys(settings) {
        let Some(value) = get_path(settings, &key) else {
            continue;
        };
        let value: toml_edit::Value = value
            .to_string()
            .parse()
            .map_err(|e: toml_edit::TomlError| invalid(format!("{key}: {e}")))?;

        let segments: Vec<&str> = key.split('.').collect();
        let Some((leaf, parents)) = segments.split_last() else {
            continue;
        };
        let mut current: &mut toml_edit::Item = doc.as_item_mut();
        for segment in parents {
            if !current.get(segment).is_some_and(toml_edit::Item::is_table_like) {
                current[segment] = toml_edit::Item::Table(toml_edit::Table::new());
            }
            current = &mut current[segment];
        }
        current[leaf] = toml_edit::value(value);
    }

    Ok(doc.to_string())
}

/// I/O wrapper: reads `file_path` (if it exists), patches it, writes back.
pub fn write_settings(file_path: &Path, settings: &Table) -> Result<(), FlagbindError> {
    let content = match std::fs::read_to_string(file_path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(FlagbindError::IoError {
                path: file_path.to_path_buf(),
                source: e,
            });
        }
    };

    let new_content = set_in_document(&content, settings, file_path)?;

    if let Some(parent) = file_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| FlagbindError::IoError {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    std::fs::write(file_path, &new_content).map_err(|e| FlagbindError::IoError {
        path: file_path.to_path_buf(),
        source: e,
    })
}
