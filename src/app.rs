//! Top-level application state
//!
//! Owns the session coordinator, the status watcher and the task archive.
//! Whatever drives the application calls into [`App`] from a single thread;
//! after every coordinator operation the watcher is re-pointed at the
//! selected session's project.

use crate::core::archive::TaskArchive;
use crate::core::events::{AppEvent, Command, InputEvent};
use crate::core::sessions::SessionCoordinator;
use crate::core::snapshot::{BackgroundTask, SessionStateSnapshot};
use crate::watcher::{StateWatcher, WatcherUpdate};
use anyhow::Result;
use tracing::{debug, warn};

pub struct App {
    coordinator: SessionCoordinator,
    watcher: StateWatcher,
    archive: TaskArchive,
}

impl App {
    pub fn new(coordinator: SessionCoordinator, watcher: StateWatcher, archive: TaskArchive) -> Self {
        let mut app = Self {
            coordinator,
            watcher,
            archive,
        };
        app.sync_watcher();
        app
    }

    /// Run one coordinator operation
    pub fn dispatch(&mut self, command: Command) {
        debug!("Dispatching {:?}", command);
        match command {
            Command::Launch { project, mode } => self.coordinator.launch(&project, mode),
            Command::SwitchTo(index) => self.coordinator.switch_to(index),
            Command::Next => self.coordinator.next(),
            Command::Previous => self.coordinator.previous(),
            Command::Close(index) => self.coordinator.close(index),
            Command::ReturnToLauncher => self.coordinator.return_to_launcher(),
            Command::Teleport(session_id) => self.coordinator.teleport(&session_id),
        }
        self.sync_watcher();
    }

    /// Handle keyboard/controller input
    pub fn handle_input(&mut self, event: InputEvent) {
        if let Some(command) = Command::from_input(event, self.coordinator.selected_index()) {
            self.dispatch(command);
        }
    }

    /// Handle an event from a background collaborator
    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::SurfaceExited { surface, code } => {
                debug!("Surface {} exited with {:?}", surface, code);
                self.coordinator.set_surface_activity(surface, false);
            }
        }
    }

    /// Publish a snapshot read by the watcher's background task
    pub fn apply_update(&mut self, update: WatcherUpdate) -> bool {
        self.watcher.apply(update)
    }

    pub fn coordinator(&self) -> &SessionCoordinator {
        &self.coordinator
    }

    pub fn watcher(&self) -> &StateWatcher {
        &self.watcher
    }

    /// Latest snapshot for the selected session
    pub fn snapshot(&self) -> SessionStateSnapshot {
        self.watcher.snapshot()
    }

    /// Background tasks of the current snapshot that have not been archived
    pub fn visible_background_tasks(&self) -> Vec<BackgroundTask> {
        let snapshot = self.watcher.snapshot();
        self.archive
            .visible_tasks(&snapshot.background_tasks)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn archive_task(&mut self, session_id: &str) -> Result<bool> {
        self.archive.archive(session_id)
    }

    pub fn unarchive_task(&mut self, session_id: &str) -> Result<bool> {
        self.archive.unarchive(session_id)
    }

    /// Point the watcher at the selected session's project, or stop it
    fn sync_watcher(&mut self) {
        let Some(session) = self.coordinator.selected_session() else {
            self.watcher.stop_watching();
            return;
        };

        let path = session.project.path.clone();
        if let Err(e) = self.watcher.watch_project(&path) {
            warn!("Cannot watch status for {:?}: {}", path, e);
        }
    }
}
