//! Archived background tasks
//!
//! Background tasks the user dismissed. Stored as a single JSON array of
//! session ID strings; the whole set is rewritten atomically on every change.

use super::artifact::write_atomic;
use super::snapshot::BackgroundTask;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Persisted set of archived background task session IDs
#[derive(Debug, Clone)]
pub struct TaskArchive {
    path: PathBuf,
    ids: BTreeSet<String>,
}

impl TaskArchive {
    /// Load the archive from its default location
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path()?)
    }

    /// Load the archive from a specific file (missing file = empty archive)
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let ids = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read task archive: {:?}", path))?;
            let ids: Vec<String> = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse task archive: {:?}", path))?;
            ids.into_iter().collect()
        } else {
            BTreeSet::new()
        };

        debug!("Loaded {} archived task(s) from {:?}", ids.len(), path);
        Ok(Self { path, ids })
    }

    /// Write the whole set back to disk
    pub fn save(&self) -> Result<()> {
        write_ids(&self.path, &self.ids)
    }

    /// Archive a task; returns false if it was already archived.
    ///
    /// The in-memory set only changes once the new set is on disk.
    pub fn archive(&mut self, session_id: &str) -> Result<bool> {
        if self.ids.contains(session_id) {
            return Ok(false);
        }
        let mut ids = self.ids.clone();
        ids.insert(session_id.to_string());
        write_ids(&self.path, &ids)?;
        self.ids = ids;
        info!("Archived background task {}", session_id);
        Ok(true)
    }

    /// Unarchive a task; returns false if it was not archived
    pub fn unarchive(&mut self, session_id: &str) -> Result<bool> {
        if !self.ids.contains(session_id) {
            return Ok(false);
        }
        let mut ids = self.ids.clone();
        ids.remove(session_id);
        write_ids(&self.path, &ids)?;
        self.ids = ids;
        info!("Unarchived background task {}", session_id);
        Ok(true)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.ids.contains(session_id)
    }

    /// Filter out archived entries from a snapshot's background task list
    pub fn visible_tasks<'a>(&self, tasks: &'a [BackgroundTask]) -> Vec<&'a BackgroundTask> {
        tasks.iter().filter(|t| !self.contains(&t.session_id)).collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Default archive file path
    pub fn default_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "deckshell", "DeckShell")
            .context("Failed to determine data directory")?;
        Ok(proj_dirs.data_dir().join("archived-tasks.json"))
    }
}

fn write_ids(path: &Path, ids: &BTreeSet<String>) -> Result<()> {
    let ids: Vec<&String> = ids.iter().collect();
    let content = serde_json::to_vec_pretty(&ids).context("Failed to serialize task archive")?;
    write_atomic(path, &content)
}
