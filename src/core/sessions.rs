//! Session coordination for multiple Claude sessions
//!
//! Owns the ordered list of open sessions (one per project, plus any
//! teleported extras), the selected tab, the tab activation order and the
//! launcher/session mode switch. Every operation is a synchronous mutation
//! that completes before returning; observers are notified afterwards over a
//! broadcast channel.

use super::config::ClaudeConfig;
use super::project::{Project, ProjectId};
use super::surface::{LaunchMode, SurfaceCommand, SurfaceFactory, SurfaceId};
use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Unique identifier for a session
pub type SessionId = usize;

/// Capacity of the coordinator event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Which top-level view the shell is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Home screen / project picker
    #[default]
    Launcher,
    /// Inside the selected session
    Session,
}

/// One open assistant instance against one project
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub project: Project,
    /// Surface lookup key (None if the surface could not be created)
    pub surface: Option<SurfaceId>,
    /// Whether the hosted process is still running
    pub is_active: bool,
    /// How the session was started
    pub launch_mode: LaunchMode,
    /// Opened via teleport rather than a normal launch
    pub teleported: bool,
}

/// Change notifications for UI consumers
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorEvent {
    SessionLaunched { session_id: SessionId, project_id: ProjectId },
    SessionClosed { session_id: SessionId, project_id: ProjectId },
    SelectionChanged { index: usize, session_id: SessionId },
    ModeChanged(Mode),
    ActivityChanged { session_id: SessionId, is_active: bool },
}

/// Read-only summary of one session for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub id: SessionId,
    pub project_id: ProjectId,
    pub project_name: String,
    pub has_surface: bool,
    pub is_active: bool,
    pub teleported: bool,
}

/// Read-only view of the whole coordinator
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorView {
    pub mode: Mode,
    /// None when there are no sessions
    pub selected_index: Option<usize>,
    pub sessions: Vec<SessionSummary>,
    pub activation_order: Vec<ProjectId>,
    pub current_project: Option<ProjectId>,
}

/// Manages the set of open sessions and the launcher/session mode
pub struct SessionCoordinator {
    sessions: Vec<Session>,
    /// Index of the selected session (meaningless while `sessions` is empty)
    selected: usize,
    mode: Mode,
    /// Project IDs in first-activation (tab) order
    activation_order: Vec<ProjectId>,
    current_project: Option<Project>,
    next_id: SessionId,
    surfaces: Box<dyn SurfaceFactory>,
    claude: ClaudeConfig,
    events: broadcast::Sender<CoordinatorEvent>,
}

impl SessionCoordinator {
    /// Create a coordinator with no sessions, in launcher mode
    pub fn new(surfaces: Box<dyn SurfaceFactory>, claude: ClaudeConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            sessions: Vec::new(),
            selected: 0,
            mode: Mode::Launcher,
            activation_order: Vec::new(),
            current_project: None,
            next_id: 0,
            surfaces,
            claude,
            events,
        }
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.events.subscribe()
    }

    /// Open a session for `project`, or bring its existing session forward
    pub fn launch(&mut self, project: &Project, mode: LaunchMode) {
        if let Some(index) = self.session_index_for_project(project.id) {
            debug!("Project {} already has session at index {}", project.name, index);
            self.select(index);
            self.set_mode(Mode::Session);
            return;
        }

        let mut project = project.clone();
        project.last_opened = Some(Utc::now());

        let index = self.create_session(project, mode, false);
        let project_id = self.sessions[index].project.id;
        if !self.activation_order.contains(&project_id) {
            self.activation_order.push(project_id);
        }

        self.select(index);
        self.set_mode(Mode::Session);
    }

    /// Select the session at `index`; invalid indices are ignored
    pub fn switch_to(&mut self, index: usize) {
        if index >= self.sessions.len() {
            debug!("Ignoring switch to invalid session index {}", index);
            return;
        }
        self.select(index);
        self.set_mode(Mode::Session);
    }

    /// Select the next session, wrapping around
    pub fn next(&mut self) {
        if self.sessions.is_empty() {
            return;
        }
        let index = (self.selected + 1) % self.sessions.len();
        self.select(index);
    }

    /// Select the previous session, wrapping around
    pub fn previous(&mut self) {
        if self.sessions.is_empty() {
            return;
        }
        let len = self.sessions.len();
        let index = (self.selected + len - 1) % len;
        self.select(index);
    }

    /// Close the session at `index` and return to the launcher.
    ///
    /// An invalid index only returns to the launcher.
    pub fn close(&mut self, index: usize) {
        if index >= self.sessions.len() {
            debug!("Close of invalid session index {}, returning to launcher", index);
            self.return_to_launcher();
            return;
        }

        let session = self.sessions.remove(index);
        if let Some(surface) = session.surface {
            self.surfaces.destroy(surface);
        }

        let project_id = session.project.id;
        if !self.sessions.iter().any(|s| s.project.id == project_id) {
            self.activation_order.retain(|id| *id != project_id);
        }

        info!(
            "Closed session {} for {} ({} remaining)",
            session.id,
            session.project.name,
            self.sessions.len()
        );
        self.emit(CoordinatorEvent::SessionClosed {
            session_id: session.id,
            project_id,
        });

        if self.sessions.is_empty() {
            self.selected = 0;
            self.current_project = None;
        } else {
            if index < self.selected {
                self.selected -= 1;
            }
            if self.selected >= self.sessions.len() {
                self.selected = self.sessions.len() - 1;
            }
            self.select(self.selected);
        }

        self.set_mode(Mode::Launcher);
    }

    /// Show the launcher, keeping sessions and selection untouched
    pub fn return_to_launcher(&mut self) {
        self.set_mode(Mode::Launcher);
    }

    /// Open an extra session for the current project that resumes `session_id`
    pub fn teleport(&mut self, session_id: &str) {
        let Some(project) = self.current_project.clone() else {
            warn!("Teleport to {} requested with no current project", session_id);
            return;
        };

        info!("Teleporting {} into session {}", project.name, session_id);
        let index = self.create_session(project, LaunchMode::Resume(session_id.to_string()), true);
        self.select(index);
        self.set_mode(Mode::Session);
    }

    /// Record whether a session's hosted process is still running
    pub fn set_activity(&mut self, session_id: SessionId, is_active: bool) {
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == session_id) else {
            return;
        };
        if session.is_active != is_active {
            session.is_active = is_active;
            self.emit(CoordinatorEvent::ActivityChanged { session_id, is_active });
        }
    }

    /// Record activity by surface handle
    pub fn set_surface_activity(&mut self, surface: SurfaceId, is_active: bool) {
        if let Some(id) = self
            .sessions
            .iter()
            .find(|s| s.surface == Some(surface))
            .map(|s| s.id)
        {
            self.set_activity(id, is_active);
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Selected index, or None if there are no sessions
    pub fn selected_index(&self) -> Option<usize> {
        (!self.sessions.is_empty()).then_some(self.selected)
    }

    pub fn selected_session(&self) -> Option<&Session> {
        self.sessions.get(self.selected)
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn activation_order(&self) -> &[ProjectId] {
        &self.activation_order
    }

    pub fn current_project(&self) -> Option<&Project> {
        self.current_project.as_ref()
    }

    pub fn get_session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// First session opened for a project
    pub fn session_for_project(&self, project_id: ProjectId) -> Option<&Session> {
        self.session_index_for_project(project_id)
            .map(|index| &self.sessions[index])
    }

    /// Snapshot of the coordinator for rendering
    pub fn view(&self) -> CoordinatorView {
        CoordinatorView {
            mode: self.mode,
            selected_index: self.selected_index(),
            sessions: self
                .sessions
                .iter()
                .map(|s| SessionSummary {
                    id: s.id,
                    project_id: s.project.id,
                    project_name: s.project.name.clone(),
                    has_surface: s.surface.is_some(),
                    is_active: s.is_active,
                    teleported: s.teleported,
                })
                .collect(),
            activation_order: self.activation_order.clone(),
            current_project: self.current_project.as_ref().map(|p| p.id),
        }
    }

    fn session_index_for_project(&self, project_id: ProjectId) -> Option<usize> {
        self.sessions.iter().position(|s| s.project.id == project_id)
    }

    /// Create a surface and append a session; returns its index
    fn create_session(&mut self, project: Project, mode: LaunchMode, teleported: bool) -> usize {
        let id = self.next_id;
        self.next_id += 1;

        let command = SurfaceCommand::for_launch(&self.claude, &mode);
        let surface = match self.surfaces.create(&project.path, &command) {
            Ok(surface) => Some(surface),
            Err(e) => {
                warn!(
                    "Failed to create surface for {} ({}): {:#}",
                    project.name,
                    command.command_line(),
                    e
                );
                None
            }
        };

        info!(
            "Launched session {} for {} at {:?} ({})",
            id,
            project.name,
            project.path,
            command.command_line()
        );

        let project_id = project.id;
        self.sessions.push(Session {
            id,
            project,
            surface,
            is_active: surface.is_some(),
            launch_mode: mode,
            teleported,
        });
        self.emit(CoordinatorEvent::SessionLaunched {
            session_id: id,
            project_id,
        });

        self.sessions.len() - 1
    }

    fn select(&mut self, index: usize) {
        let Some(session) = self.sessions.get(index) else {
            return;
        };
        let session_id = session.id;
        self.current_project = Some(session.project.clone());
        self.selected = index;
        self.emit(CoordinatorEvent::SelectionChanged { index, session_id });
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            self.mode = mode;
            self.emit(CoordinatorEvent::ModeChanged(mode));
        }
    }

    fn emit(&self, event: CoordinatorEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }
}
