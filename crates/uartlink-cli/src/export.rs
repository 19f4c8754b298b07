//! Trace export
//!
//! Persists text received over a link to a file. Callers hand in the
//! captured content and a file name; the module resolves the target
//! directory, writes the file, and reports the saved path or the failure.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use crate::error::{CliError, Result};

/// Generate a trace file name stamped with the current time
pub fn trace_file_name() -> String {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("OSM_Trace_{}.txt", stamp)
}

/// Write `content` to `file_name` under `directory`
///
/// Falls back to the platform download directory, then the working
/// directory, when no directory is given.
pub fn save_file(content: &str, file_name: &str, directory: Option<&Path>) -> Result<PathBuf> {
    let dir = directory
        .map(Path::to_path_buf)
        .or_else(dirs::download_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    std::fs::create_dir_all(&dir)
        .map_err(|e| CliError::Export(format!("cannot create {}: {}", dir.display(), e)))?;

    let path = dir.join(file_name);
    std::fs::write(&path, content)
        .map_err(|e| CliError::Export(format!("cannot write {}: {}", path.display(), e)))?;

    info!("Exported {} bytes to {}", content.len(), path.display());
    Ok(path)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
