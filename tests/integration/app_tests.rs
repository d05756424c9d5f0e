//! End-to-end tests: coordinator operations drive the watcher

use crate::common::MockSurfaces;
use deck_shell::app::App;
use deck_shell::core::archive::TaskArchive;
use deck_shell::core::artifact::write_atomic;
use deck_shell::core::config::ClaudeConfig;
use deck_shell::core::events::{AppEvent, Button, Command, Direction, InputEvent};
use deck_shell::core::project::Project;
use deck_shell::core::sessions::{Mode, SessionCoordinator};
use deck_shell::core::snapshot::SessionStateSnapshot;
use deck_shell::core::surface::LaunchMode;
use deck_shell::watcher::{StateWatcher, WatchPhase, WatcherConfig, WatcherUpdate};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};

const WAIT: Duration = Duration::from_secs(5);

struct Harness {
    app: App,
    updates: mpsc::UnboundedReceiver<WatcherUpdate>,
    surfaces: MockSurfaces,
    state_dir: TempDir,
    archive_dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        let state_dir = tempfile::tempdir().unwrap();
        let archive_dir = tempfile::tempdir().unwrap();
        let surfaces = MockSurfaces::default();
        let (tx, updates) = mpsc::unbounded_channel();

        let coordinator = SessionCoordinator::new(Box::new(surfaces.clone()), ClaudeConfig::default());
        let config = WatcherConfig {
            poll_interval: Duration::from_millis(100),
            rewatch_delay: Duration::from_millis(20),
            file_events: false,
        };
        let watcher = StateWatcher::new(state_dir.path(), config, tx);
        let archive = TaskArchive::load_from(archive_dir.path().join("archived.json")).unwrap();

        Self {
            app: App::new(coordinator, watcher, archive),
            updates,
            surfaces,
            state_dir,
            archive_dir,
        }
    }

    fn write_artifact(&self, name: &str, json: &str) {
        write_atomic(&self.state_dir.path().join(name), json.as_bytes()).unwrap();
    }

    async fn pump_until(&mut self, done: impl Fn(&SessionStateSnapshot) -> bool) -> bool {
        let deadline = Instant::now() + WAIT;
        while !done(&self.app.snapshot()) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match timeout(remaining, self.updates.recv()).await {
                Ok(Some(update)) => {
                    self.app.apply_update(update);
                }
                Ok(None) | Err(_) => return false,
            }
        }
        true
    }
}

#[tokio::test]
async fn test_launch_follows_project_artifact() {
    let mut h = Harness::new();
    assert_eq!(h.app.watcher().phase(), WatchPhase::Idle);

    let project = Project::new("/work/My App!");
    h.app.dispatch(Command::Launch {
        project,
        mode: LaunchMode::Continue,
    });

    assert_eq!(h.app.coordinator().mode(), Mode::Session);
    assert_eq!(h.app.watcher().phase(), WatchPhase::Searching);
    assert_eq!(
        h.app.watcher().watched_path(),
        Some(h.state_dir.path().join("project-MyApp.json").as_path())
    );

    h.write_artifact(
        "project-MyApp.json",
        r#"{"timestamp":"2026-03-01T12:00:00Z","contextPercent":10}"#,
    );
    assert!(h.pump_until(|s| s.context_percent == 10.0).await);
    assert_eq!(h.app.watcher().phase(), WatchPhase::Watching);
}

#[tokio::test]
async fn test_switching_tabs_repoints_watcher() {
    let mut h = Harness::new();
    h.write_artifact("project-alpha.json", r#"{"timestamp":1772366400,"model":"Opus"}"#);
    h.write_artifact("project-beta.json", r#"{"timestamp":1772366400,"model":"Sonnet"}"#);

    for path in ["/work/alpha", "/work/beta"] {
        h.app.dispatch(Command::Launch {
            project: Project::new(path),
            mode: LaunchMode::Continue,
        });
    }
    assert!(h.pump_until(|s| s.model == "Sonnet").await);

    h.app.handle_input(InputEvent::Direction(Direction::Left));
    assert_eq!(h.app.coordinator().selected_index(), Some(0));
    assert!(h.pump_until(|s| s.model == "Opus").await);

    // Returning to the launcher keeps following the selected tab
    h.app.handle_input(InputEvent::Button(Button::Back));
    assert_eq!(h.app.coordinator().mode(), Mode::Launcher);
    assert!(h
        .app
        .watcher()
        .watched_path()
        .is_some_and(|p| p.ends_with("project-alpha.json")));
}

#[tokio::test]
async fn test_closing_last_session_stops_watching() {
    let mut h = Harness::new();
    h.app.dispatch(Command::Launch {
        project: Project::new("/work/app"),
        mode: LaunchMode::Fresh,
    });
    assert_ne!(h.app.watcher().phase(), WatchPhase::Idle);

    h.app.handle_input(InputEvent::Button(Button::Close));
    assert!(h.app.coordinator().is_empty());
    assert_eq!(h.app.watcher().phase(), WatchPhase::Idle);
    assert!(h.app.watcher().watched_path().is_none());
    assert_eq!(h.surfaces.log.lock().destroyed.len(), 1);

    // With nothing selected, close and confirm have nothing to act on
    h.app.handle_input(InputEvent::Button(Button::Confirm));
    assert_eq!(h.app.coordinator().mode(), Mode::Launcher);
}

#[tokio::test]
async fn test_surface_exit_marks_session_inactive() {
    let mut h = Harness::new();
    h.app.dispatch(Command::Launch {
        project: Project::new("/work/app"),
        mode: LaunchMode::Continue,
    });
    let surface = h.app.coordinator().sessions()[0].surface.unwrap();
    assert!(h.app.coordinator().sessions()[0].is_active);

    h.app.handle_event(AppEvent::SurfaceExited {
        surface,
        code: Some(0),
    });
    assert!(!h.app.coordinator().sessions()[0].is_active);
    // The session itself stays open
    assert_eq!(h.app.coordinator().session_count(), 1);
}

#[tokio::test]
async fn test_archived_background_tasks_are_hidden() {
    let mut h = Harness::new();
    h.app.dispatch(Command::Launch {
        project: Project::new("/work/app"),
        mode: LaunchMode::Continue,
    });
    h.write_artifact(
        "project-app.json",
        r#"{
            "timestamp": "2026-03-01T12:00:00Z",
            "backgroundTasks": [
                {"sessionId": "one", "description": "Fix tests", "url": "https://example.invalid/one"},
                {"sessionId": "two", "description": "Write docs", "url": null}
            ]
        }"#,
    );
    assert!(h.pump_until(|s| s.background_tasks.len() == 2).await);
    assert_eq!(h.app.visible_background_tasks().len(), 2);

    assert!(h.app.archive_task("one").unwrap());
    assert!(!h.app.archive_task("one").unwrap());
    let visible = h.app.visible_background_tasks();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].session_id, "two");

    let reloaded = TaskArchive::load_from(h.archive_dir.path().join("archived.json")).unwrap();
    assert!(reloaded.contains("one"));

    assert!(h.app.unarchive_task("one").unwrap());
    assert_eq!(h.app.visible_background_tasks().len(), 2);
}

#[tokio::test]
async fn test_teleport_resumes_in_current_project() {
    let mut h = Harness::new();
    h.app.dispatch(Command::Teleport("remote-1".to_string()));
    assert!(h.app.coordinator().is_empty());

    let project = Project::new("/work/app");
    h.app.dispatch(Command::Launch {
        project,
        mode: LaunchMode::Continue,
    });
    h.app.dispatch(Command::Teleport("remote-1".to_string()));

    assert_eq!(h.app.coordinator().session_count(), 2);
    assert_eq!(h.app.coordinator().selected_index(), Some(1));
    assert_eq!(
        h.app.watcher().watched_path(),
        Some(h.state_dir.path().join("project-app.json").as_path())
    );

    let log = h.surfaces.log.lock();
    assert_eq!(log.created[1].1, "claude --resume remote-1");
}
