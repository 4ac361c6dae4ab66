//! Snapshot persistence
//!
//! One JSON document per snapshot, written through a temp file and an
//! atomic rename so a crashed run never leaves a torn artifact. Loads
//! are schema-checked; unknown fields ride along in the `extra` maps
//! and survive the next save.

use crate::core::error::{Error, Result};
use crate::snapshot::types::Snapshot;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default artifact location inside a project
pub fn default_snapshot_path(project_root: &Path) -> PathBuf {
    project_root.join(".codepack").join("snapshot.json")
}

/// Serialize a snapshot to its wire form
pub fn to_json_string(snapshot: &Snapshot) -> Result<String> {
    Ok(serde_json::to_string(snapshot)?)
}

/// Write `snapshot` to `path` atomically, creating parent directories
pub fn save(snapshot: &Snapshot, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| Error::File {
                file_path: parent.to_path_buf(),
                operation: "create directory",
                source: e,
            })?;
        }
    }

    let json = to_json_string(snapshot)?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, &json).map_err(|e| Error::File {
        file_path: tmp_path.clone(),
        operation: "write",
        source: e,
    })?;
    fs::rename(&tmp_path, path).map_err(|e| Error::File {
        file_path: path.to_path_buf(),
        operation: "rename",
        source: e,
    })?;

    debug!(path = %path.display(), bytes = json.len(), "Snapshot saved");
    Ok(())
}

/// Load and schema-check a snapshot
pub fn load(path: &Path) -> Result<Snapshot> {
    let json = fs::read_to_string(path).map_err(|e| Error::File {
        file_path: path.to_path_buf(),
        operation: "read",
        source: e,
    })?;
    serde_json::from_str(&json).map_err(|e| Error::Config {
        config_path: path.to_path_buf(),
        expected: "snapshot document",
        message: e.to_string(),
    })
}

/// Rough LLM-token forecast for a serialized byte length
pub fn estimate_tokens(byte_length: usize) -> usize {
    byte_length.div_ceil(4)
}
