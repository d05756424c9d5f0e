//! Status artifact watcher
//!
//! Follows the status artifact of one project. Two channels feed re-reads:
//! a fixed-interval poll, and OS file events for the artifact itself. Polling
//! is what guarantees correctness (file events for renames and attribute
//! changes are not delivered consistently on every platform); the event
//! channel only makes updates show up sooner.
//!
//! The background task never publishes directly. It sends [`WatcherUpdate`]s
//! to the owner, who applies them on its own thread with
//! [`StateWatcher::apply`], so snapshot changes never interleave with other
//! state mutations.

use super::fs_events::ArtifactEvent;
use crate::core::artifact::artifact_path;
use crate::core::config::WatcherSection;
use crate::core::snapshot::{parse_snapshot, ArtifactError, SessionStateSnapshot};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Watcher usage errors
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("no project path given")]
    EmptyPath,
    #[error("state watcher needs a running tokio runtime")]
    NoRuntime,
}

/// Where the watcher is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchPhase {
    /// Not watching anything
    #[default]
    Idle,
    /// Waiting for the artifact to appear
    Searching,
    /// Artifact found and being followed
    Watching,
}

/// Timing knobs for the watcher
#[derive(Debug, Clone, PartialEq)]
pub struct WatcherConfig {
    /// Re-read interval, also used to look for a missing artifact
    pub poll_interval: Duration,
    /// Pause after a rename/delete before re-opening the artifact
    pub rewatch_delay: Duration,
    /// Subscribe to OS file events (polling always runs)
    pub file_events: bool,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self::from(&WatcherSection::default())
    }
}

impl From<&WatcherSection> for WatcherConfig {
    fn from(section: &WatcherSection) -> Self {
        Self {
            poll_interval: section.poll_interval(),
            rewatch_delay: section.rewatch_delay(),
            file_events: section.file_events,
        }
    }
}

/// A parsed snapshot produced by a background watch, to be applied by the owner
#[derive(Debug, Clone)]
pub struct WatcherUpdate {
    generation: u64,
    pub snapshot: SessionStateSnapshot,
}

impl WatcherUpdate {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// State shared between the owner and one background watch
struct WatchShared {
    cancelled: AtomicBool,
    phase: Mutex<WatchPhase>,
    fs_watcher: Mutex<Option<RecommendedWatcher>>,
}

impl WatchShared {
    fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            phase: Mutex::new(WatchPhase::Idle),
            fs_watcher: Mutex::new(None),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn set_phase(&self, phase: WatchPhase) {
        let mut guard = self.phase.lock();
        if !self.is_cancelled() {
            *guard = phase;
        }
    }

    fn release(&self) {
        self.fs_watcher.lock().take();
    }

    /// Mark the watch cancelled and drop the OS watcher.
    ///
    /// Takes the `fs_watcher` lock, so a watcher being created concurrently is
    /// dropped before this returns.
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.release();
        *self.phase.lock() = WatchPhase::Idle;
    }
}

struct ActiveWatch {
    artifact: PathBuf,
    shared: Arc<WatchShared>,
    task: JoinHandle<()>,
}

/// Watches one project's status artifact and publishes the latest snapshot
pub struct StateWatcher {
    config: WatcherConfig,
    state_dir: PathBuf,
    updates: mpsc::UnboundedSender<WatcherUpdate>,
    published: watch::Sender<SessionStateSnapshot>,
    generation: u64,
    active: Option<ActiveWatch>,
}

impl StateWatcher {
    /// Create an idle watcher. Background reads are delivered to `updates`.
    pub fn new(
        state_dir: impl Into<PathBuf>,
        config: WatcherConfig,
        updates: mpsc::UnboundedSender<WatcherUpdate>,
    ) -> Self {
        let (published, _) = watch::channel(SessionStateSnapshot::default());
        Self {
            config,
            state_dir: state_dir.into(),
            updates,
            published,
            generation: 0,
            active: None,
        }
    }

    /// Start following the artifact for the project at `project_path`
    pub fn watch_project(&mut self, project_path: &Path) -> Result<(), WatchError> {
        if project_path.as_os_str().is_empty() {
            return Err(WatchError::EmptyPath);
        }
        let artifact = artifact_path(&self.state_dir, project_path);
        self.watch_artifact(artifact)
    }

    /// Start following a specific artifact file.
    ///
    /// Watching the path already being watched is a no-op. Any other watch is
    /// fully stopped first.
    pub fn watch_artifact(&mut self, artifact: PathBuf) -> Result<(), WatchError> {
        if artifact.as_os_str().is_empty() {
            return Err(WatchError::EmptyPath);
        }
        if self.watched_path() == Some(artifact.as_path()) {
            return Ok(());
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| WatchError::NoRuntime)?;

        self.stop_watching();
        self.published.send_replace(SessionStateSnapshot::default());

        self.generation += 1;
        let shared = Arc::new(WatchShared::new());
        shared.set_phase(if artifact.exists() {
            WatchPhase::Watching
        } else {
            WatchPhase::Searching
        });
        let task = WatchTask {
            artifact: artifact.clone(),
            config: self.config.clone(),
            generation: self.generation,
            shared: Arc::clone(&shared),
            updates: self.updates.clone(),
            last_content: None,
            last_error: None,
        };

        info!("Watching status artifact {:?}", artifact);
        let task = runtime.spawn(task.run());
        self.active = Some(ActiveWatch {
            artifact,
            shared,
            task,
        });
        Ok(())
    }

    /// Stop the poll timer and event subscription; safe to call at any time
    pub fn stop_watching(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        active.shared.cancel();
        active.task.abort();
        // Updates still in flight belong to the old generation and get dropped
        self.generation += 1;
        info!("Stopped watching {:?}", active.artifact);
    }

    /// Publish an update from the background task.
    ///
    /// Returns true if the published snapshot changed. Updates from a watch
    /// that has since been stopped or re-pointed are discarded.
    pub fn apply(&mut self, update: WatcherUpdate) -> bool {
        if update.generation != self.generation || self.active.is_none() {
            debug!(
                "Discarding stale watcher update (generation {} != {})",
                update.generation, self.generation
            );
            return false;
        }

        let snapshot = update.snapshot;
        self.published.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        })
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> SessionStateSnapshot {
        self.published.borrow().clone()
    }

    /// Receive every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<SessionStateSnapshot> {
        self.published.subscribe()
    }

    pub fn phase(&self) -> WatchPhase {
        self.active
            .as_ref()
            .map(|active| *active.shared.phase.lock())
            .unwrap_or(WatchPhase::Idle)
    }

    /// Artifact currently being watched
    pub fn watched_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|active| active.artifact.as_path())
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }
}

impl Drop for StateWatcher {
    fn drop(&mut self) {
        self.stop_watching();
    }
}

/// Result of one read attempt
enum ReadOutcome {
    Parsed,
    Unchanged,
    Rejected,
    Missing,
}

/// Background side of one watch
struct WatchTask {
    artifact: PathBuf,
    config: WatcherConfig,
    generation: u64,
    shared: Arc<WatchShared>,
    updates: mpsc::UnboundedSender<WatcherUpdate>,
    /// Last successfully parsed file contents
    last_content: Option<String>,
    /// Last parse error, to avoid repeating the same warning every poll
    last_error: Option<String>,
}

impl WatchTask {
    async fn run(mut self) {
        loop {
            self.search().await;
            if self.shared.is_cancelled() {
                return;
            }

            self.follow().await;
            if self.shared.is_cancelled() {
                return;
            }

            // Replaced by rename (or deleted): give the writer a moment, then reopen
            self.shared.set_phase(WatchPhase::Searching);
            tokio::time::sleep(self.config.rewatch_delay).await;
        }
    }

    /// Wait until the artifact exists
    async fn search(&mut self) {
        if self.artifact.exists() {
            return;
        }

        self.shared.set_phase(WatchPhase::Searching);
        debug!("Searching for status artifact {:?}", self.artifact);

        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if self.shared.is_cancelled() || self.artifact.exists() {
                return;
            }
        }
    }

    /// Follow the artifact until it is replaced, removed, or the watch is cancelled
    async fn follow(&mut self) {
        self.shared.set_phase(WatchPhase::Watching);
        let mut events = self.open_event_channel();

        if let ReadOutcome::Missing = self.reload().await {
            self.shared.release();
            return;
        }

        let period = self.config.poll_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if self.shared.is_cancelled() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    if let ReadOutcome::Missing = self.reload().await {
                        debug!("Status artifact {:?} disappeared", self.artifact);
                        break;
                    }
                }
                event = next_event(&mut events) => {
                    let Some(event) = event else {
                        // Event channel closed; polling carries on alone
                        events = None;
                        continue;
                    };
                    match ArtifactEvent::classify(&event.kind) {
                        ArtifactEvent::Replaced => {
                            debug!("Status artifact {:?} replaced ({:?})", self.artifact, event.kind);
                            break;
                        }
                        ArtifactEvent::Changed => {
                            if let ReadOutcome::Missing = self.reload().await {
                                break;
                            }
                        }
                        ArtifactEvent::Ignored => {}
                    }
                }
            }
        }

        // The old inode's watch is useless after a rename
        self.shared.release();
    }

    /// Subscribe to OS events for the artifact, if enabled and available.
    ///
    /// The OS watcher is created and stored under the `fs_watcher` lock, after
    /// checking for cancellation under that same lock.
    fn open_event_channel(&self) -> Option<mpsc::UnboundedReceiver<notify::Event>> {
        if !self.config.file_events {
            return None;
        }

        let mut slot = self.shared.fs_watcher.lock();
        if self.shared.is_cancelled() {
            return None;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = match RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    let _ = tx.send(event);
                }
                Err(e) => debug!("File event error: {}", e),
            },
            notify::Config::default(),
        ) {
            Ok(watcher) => watcher,
            Err(e) => {
                warn!("Failed to create file watcher, relying on polling: {}", e);
                return None;
            }
        };

        if let Err(e) = watcher.watch(&self.artifact, RecursiveMode::NonRecursive) {
            debug!("Failed to watch {:?}, relying on polling: {}", self.artifact, e);
            return None;
        }

        *slot = Some(watcher);
        Some(rx)
    }

    /// Read and parse the artifact, forwarding a snapshot on success
    async fn reload(&mut self) -> ReadOutcome {
        match self.read().await {
            Ok(Some((content, snapshot))) => {
                self.last_error = None;
                if self.shared.is_cancelled() {
                    return ReadOutcome::Unchanged;
                }
                self.last_content = Some(content);
                let _ = self.updates.send(WatcherUpdate {
                    generation: self.generation,
                    snapshot,
                });
                ReadOutcome::Parsed
            }
            Ok(None) => ReadOutcome::Unchanged,
            Err(ArtifactError::Read(e)) if e.kind() == std::io::ErrorKind::NotFound => ReadOutcome::Missing,
            Err(e) => {
                let message = e.to_string();
                if self.last_error.as_deref() != Some(message.as_str()) {
                    warn!("Keeping previous snapshot, {:?}: {}", self.artifact, message);
                    self.last_error = Some(message);
                } else {
                    debug!("Still unreadable {:?}: {}", self.artifact, message);
                }
                ReadOutcome::Rejected
            }
        }
    }

    /// Returns None if the contents match the last parsed read
    async fn read(&self) -> Result<Option<(String, SessionStateSnapshot)>, ArtifactError> {
        let content = tokio::fs::read_to_string(&self.artifact).await?;
        if self.last_content.as_deref() == Some(content.as_str()) {
            return Ok(None);
        }
        let snapshot = parse_snapshot(&content)?;
        Ok(Some((content, snapshot)))
    }
}

async fn next_event(
    events: &mut Option<mpsc::UnboundedReceiver<notify::Event>>,
) -> Option<notify::Event> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
