//! `hoist-layer.json` lock artifact.
//!
//! A pretty-printed JSON array of flattened layer records, sorted by name.
//! Frozen installs replay it instead of running discovery.

use super::error::HoistError;
use super::manifest::LayerRecord;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};

/// Lock artifact file name, in the workspace root.
pub const LOCK_FILE_NAME: &str = "hoist-layer.json";

/// Path of the lock artifact for a workspace root.
#[must_use]
pub fn lock_path(root: &Path) -> PathBuf {
    root.join(LOCK_FILE_NAME)
}

/// Serialize records as the artifact content (two-space indent).
pub fn to_json(records: &[LayerRecord]) -> Result<String, HoistError> {
    serde_json::to_string_pretty(records)
        .map_err(|e| HoistError::lock_write_failed(format!("Failed to serialize lock: {e}")))
}

/// Parse artifact content.
///
/// The top level must be an array; anything else is rejected even if it is
/// valid JSON.
pub fn from_json(json: &str) -> Result<Vec<LayerRecord>, HoistError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| HoistError::lock_invalid(format!("Invalid lock JSON: {e}")))?;

    if !value.is_array() {
        return Err(HoistError::lock_invalid(
            "Invalid lock: top level is not an array",
        ));
    }

    serde_json::from_value(value)
        .map_err(|e| HoistError::lock_invalid(format!("Invalid lock record: {e}")))
}

/// Write the artifact atomically, returning its path.
///
/// Records are written sorted by name regardless of input order.
pub fn write_lock(root: &Path, records: &[LayerRecord]) -> Result<PathBuf, HoistError> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let content = to_json(&sorted)?;
    let path = lock_path(root);
    layerhoist_util::fs::atomic_write(&path, content.as_bytes()).map_err(|e| {
        HoistError::lock_write_failed(format!("Failed to write {}: {e}", path.display()))
    })?;

    Ok(path)
}

/// Read the artifact from a workspace root.
pub fn read_lock(root: &Path) -> Result<Vec<LayerRecord>, HoistError> {
    let path = lock_path(root);
    let content = layerhoist_util::fs::read_to_string_lossy(&path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            HoistError::lock_not_found(&path)
        } else {
            HoistError::lock_invalid(format!("Failed to read {}: {e}", path.display()))
        }
    })?;

    from_json(&content)
}

/// BLAKE3 digest of the artifact content the records serialize to.
pub fn lock_digest(records: &[LayerRecord]) -> Result<String, HoistError> {
    let content = to_json(records)?;
    Ok(layerhoist_util::hash::digest_bytes(content.as_bytes()))
}
