//! Package manifest reading and writing
//!
//! Manifests are handled as ordered JSON objects so that every field we do
//! not touch keeps its value and position.

use super::ExportMap;
use crate::error::{BuildError, BuildResult};
use serde_json::{Map, Value};
use std::path::Path;

/// Read a manifest; a missing file is an empty object
pub async fn read_manifest(path: &Path) -> BuildResult<Map<String, Value>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(e) => return Err(BuildError::io(path, e)),
    };

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err(BuildError::invalid_manifest(path, "not a JSON object")),
        Err(e) => Err(BuildError::invalid_manifest(path, e)),
    }
}

/// Write a manifest with two-space indentation and a trailing newline
pub async fn write_manifest(path: &Path, manifest: &Map<String, Value>) -> BuildResult<()> {
    let mut content = serde_json::to_string_pretty(manifest)
        .map_err(|e| BuildError::invalid_manifest(path, e))?;
    content.push('\n');

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| BuildError::io(parent, e))?;
    }

    tokio::fs::write(path, content)
        .await
        .map_err(|e| BuildError::io(path, e))
}

/// Set `main`, `module`, `types` and `exports` from an export map.
///
/// Convenience fields without a value are removed; fields already present
/// keep their position.
pub fn apply_exports(manifest: &mut Map<String, Value>, exports: &ExportMap) {
    for (field, value) in [
        ("main", exports.main()),
        ("module", exports.module()),
        ("types", exports.types()),
    ] {
        match value {
            Some(value) => {
                manifest.insert(field.to_string(), Value::String(value.to_string()));
            }
            None => {
                manifest.shift_remove(field);
            }
        }
    }

    manifest.insert("exports".to_string(), exports.to_json());
}
