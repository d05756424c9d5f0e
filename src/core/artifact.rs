//! Status artifact location and atomic writes
//!
//! The status hook writes one JSON file per project into a shared state
//! directory, named `project-<sanitized basename>.json`. Writers always go
//! through a temp file in the same directory followed by a rename, so readers
//! only ever see a complete document.
//!
//! Two projects whose basenames sanitize to the same string share one
//! artifact (`/a/My App!` and `/b/MyApp` both map to `project-MyApp.json`).
//! This is a known limitation of the naming scheme and is not disambiguated.

use super::snapshot::SessionStateSnapshot;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Prefix of every artifact file name
pub const ARTIFACT_PREFIX: &str = "project-";

/// Extension of every artifact file name
pub const ARTIFACT_EXTENSION: &str = "json";

/// Keep only ASCII letters, digits, `-` and `_`
pub fn sanitize_project_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

/// Artifact file name for a project directory
///
/// Example: `/work/My App!` → `project-MyApp.json`
pub fn artifact_file_name(project_path: &Path) -> String {
    let base = project_path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    format!(
        "{}{}.{}",
        ARTIFACT_PREFIX,
        sanitize_project_name(&base),
        ARTIFACT_EXTENSION
    )
}

/// Full artifact path for a project directory inside `state_dir`
pub fn artifact_path(state_dir: &Path, project_path: &Path) -> PathBuf {
    state_dir.join(artifact_file_name(project_path))
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write `contents` to `path` via temp file + rename in the same directory
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory: {:?}", parent))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("Atomic write target has no file name")?;
    let temp_path = parent.join(format!(
        ".{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let result = (|| -> Result<()> {
        let mut file = std::fs::File::create(&temp_path)
            .with_context(|| format!("Failed to create temp file: {:?}", temp_path))?;
        file.write_all(contents)
            .with_context(|| format!("Failed to write temp file: {:?}", temp_path))?;
        file.sync_all()
            .with_context(|| format!("Failed to sync temp file: {:?}", temp_path))?;
        std::fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to rename {:?} to {:?}", temp_path, path))?;
        Ok(())
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    result
}

/// Producer side of the contract: serialize a snapshot and write it atomically
pub fn write_snapshot(path: &Path, snapshot: &SessionStateSnapshot) -> Result<()> {
    let content = serde_json::to_vec_pretty(snapshot).context("Failed to serialize snapshot")?;
    write_atomic(path, &content)
}
