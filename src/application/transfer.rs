//! JSON file export and import.

use std::fs;
use std::path::Path;

use crate::domain::{AppError, ImportReport, Result};
use crate::infrastructure::KeyValueStore;

use super::quote_store::QuoteStore;

/// Default export file name.
pub const DEFAULT_EXPORT_FILE: &str = "quotes.json";

/// Write the whole collection to `path` as pretty-printed JSON.
///
/// Returns the number of quotes written.
///
/// # Errors
/// Returns error if serialization or the file write fails.
pub fn export_to_file<S: KeyValueStore>(store: &QuoteStore<S>, path: &Path) -> Result<usize> {
    let json = store.export_json()?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io(format!("Failed to create {}", parent.display()), e))?;
    }

    fs::write(path, json)
        .map_err(|e| AppError::io(format!("Failed to write {}", path.display()), e))?;

    tracing::info!(path = %path.display(), count = store.len(), "Quotes exported");

    Ok(store.len())
}

/// Append the quotes found in the JSON file at `path`.
///
/// # Errors
/// Returns an IO error if the file cannot be read, or the store's format
/// error if it does not contain a JSON array.
pub fn import_from_file<S: KeyValueStore>(
    store: &mut QuoteStore<S>,
    path: &Path,
) -> Result<ImportReport> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read {}", path.display()), e))?;

    store.import_batch(&raw)
}
