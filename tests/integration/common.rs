//! Shared test helpers

use anyhow::{anyhow, Result};
use chrono::{TimeZone, Utc};
use deck_shell::core::snapshot::SessionStateSnapshot;
use deck_shell::core::surface::{SurfaceCommand, SurfaceFactory, SurfaceId};
use deck_shell::watcher::{StateWatcher, WatcherUpdate};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};

/// What the mock factory has been asked to do
#[derive(Debug, Default)]
pub struct SurfaceLog {
    pub created: Vec<(PathBuf, String)>,
    pub destroyed: Vec<SurfaceId>,
}

/// Surface factory that records calls and can be told to fail
#[derive(Clone, Default)]
pub struct MockSurfaces {
    pub log: Arc<Mutex<SurfaceLog>>,
    pub fail: Arc<Mutex<bool>>,
}

impl SurfaceFactory for MockSurfaces {
    fn create(&mut self, working_directory: &Path, command: &SurfaceCommand) -> Result<SurfaceId> {
        if *self.fail.lock() {
            return Err(anyhow!("terminal engine unavailable"));
        }
        let mut log = self.log.lock();
        log.created
            .push((working_directory.to_path_buf(), command.command_line()));
        Ok(log.created.len() as SurfaceId)
    }

    fn destroy(&mut self, surface: SurfaceId) {
        self.log.lock().destroyed.push(surface);
    }
}

/// Snapshot JSON with the given epoch-second timestamp
pub fn snapshot_json(seconds: i64, context_percent: u32) -> String {
    let timestamp = Utc.timestamp_opt(seconds, 0).unwrap().to_rfc3339();
    format!(
        r#"{{"timestamp":"{}","model":"Opus","contextPercent":{}}}"#,
        timestamp, context_percent
    )
}

/// Apply watcher updates until `done` holds for the published snapshot
pub async fn pump_until(
    watcher: &mut StateWatcher,
    updates: &mut mpsc::UnboundedReceiver<WatcherUpdate>,
    wait: Duration,
    done: impl Fn(&SessionStateSnapshot) -> bool,
) -> bool {
    let deadline = Instant::now() + wait;
    loop {
        if done(&watcher.snapshot()) {
            return true;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return false;
        }
        match timeout(remaining, updates.recv()).await {
            Ok(Some(update)) => {
                watcher.apply(update);
            }
            Ok(None) | Err(_) => return done(&watcher.snapshot()),
        }
    }
}

/// Apply every update that arrives within `wait`
pub async fn pump_for(
    watcher: &mut StateWatcher,
    updates: &mut mpsc::UnboundedReceiver<WatcherUpdate>,
    wait: Duration,
) {
    let deadline = Instant::now() + wait;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return;
        }
        match timeout(remaining, updates.recv()).await {
            Ok(Some(update)) => {
                watcher.apply(update);
            }
            Ok(None) | Err(_) => return,
        }
    }
}
