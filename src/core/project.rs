//! Projects known to the catalog
//!
//! The catalog itself lives outside this crate; sessions only hold a copy of
//! the project they were launched for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::artifact::artifact_path;

/// Stable project identifier
pub type ProjectId = Uuid;

/// A project directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    /// Display name
    pub name: String,
    /// Absolute path to the project directory
    pub path: PathBuf,
    pub last_opened: Option<DateTime<Utc>>,
}

impl Project {
    /// Create a project named after its directory
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        Self {
            id: Uuid::new_v4(),
            name,
            path,
            last_opened: None,
        }
    }

    /// Where the status hook writes this project's artifact
    pub fn artifact_path(&self, state_dir: &Path) -> PathBuf {
        artifact_path(state_dir, &self.path)
    }

    /// Path for display, using ~ for the home directory
    pub fn display_path(&self) -> String {
        let path_str = self.path.to_string_lossy();

        if let Some(home) = dirs::home_dir() {
            if let Ok(rest) = self.path.strip_prefix(&home) {
                return format!("~/{}", rest.to_string_lossy());
            }
        }

        path_str.to_string()
    }
}
