//! Session coordinator tests through the public API

use crate::common::MockSurfaces;
use deck_shell::core::config::ClaudeConfig;
use deck_shell::core::project::Project;
use deck_shell::core::sessions::{Mode, SessionCoordinator};
use deck_shell::core::surface::LaunchMode;
use std::collections::HashSet;
use std::path::PathBuf;

fn coordinator(surfaces: &MockSurfaces) -> SessionCoordinator {
    SessionCoordinator::new(Box::new(surfaces.clone()), ClaudeConfig::default())
}

fn projects(count: usize) -> Vec<Project> {
    (0..count)
        .map(|i| Project::new(format!("/work/project-{}", i)))
        .collect()
}

/// Small deterministic generator so failures are reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound
    }
}

fn check_invariants(coord: &SessionCoordinator) {
    let view = coord.view();

    match view.selected_index {
        Some(index) => assert!(index < view.sessions.len()),
        None => assert!(view.sessions.is_empty()),
    }

    let unique: HashSet<_> = view.activation_order.iter().collect();
    assert_eq!(unique.len(), view.activation_order.len(), "duplicate in activation order");

    let with_sessions: HashSet<_> = view.sessions.iter().map(|s| &s.project_id).collect();
    assert_eq!(unique, with_sessions);

    if view.sessions.is_empty() {
        assert!(view.current_project.is_none());
    } else {
        let selected = coord.selected_session().unwrap();
        assert_eq!(view.current_project, Some(selected.project.id));
    }
}

#[test]
fn test_random_operation_sequences_hold_invariants() {
    let catalog = projects(5);

    for seed in 0..50u64 {
        let surfaces = MockSurfaces::default();
        let mut coord = coordinator(&surfaces);
        let mut rng = Lcg(seed);

        for _ in 0..200 {
            match rng.next(7) {
                0 => coord.launch(&catalog[rng.next(catalog.len())], LaunchMode::Continue),
                1 => coord.switch_to(rng.next(8)),
                2 => coord.next(),
                3 => coord.previous(),
                4 => {
                    coord.close(rng.next(8));
                    assert_eq!(coord.mode(), Mode::Launcher);
                }
                5 => coord.return_to_launcher(),
                _ => coord.teleport(&format!("remote-{}", rng.next(100))),
            }
            check_invariants(&coord);
        }

        // Every destroyed surface was created first and destroyed once
        let log = surfaces.log.lock();
        let destroyed: HashSet<_> = log.destroyed.iter().collect();
        assert_eq!(destroyed.len(), log.destroyed.len());
        assert!(log
            .destroyed
            .iter()
            .all(|id| *id >= 1 && *id as usize <= log.created.len()));
        assert_eq!(log.created.len() - log.destroyed.len(), coord.session_count());
    }
}

#[test]
fn test_launching_twice_keeps_one_session() {
    let surfaces = MockSurfaces::default();
    let mut coord = coordinator(&surfaces);
    let project = Project::new("/work/app");

    coord.launch(&project, LaunchMode::Continue);
    coord.return_to_launcher();
    coord.launch(&project, LaunchMode::Fresh);

    assert_eq!(coord.session_count(), 1);
    assert_eq!(coord.mode(), Mode::Session);
    assert_eq!(surfaces.log.lock().created.len(), 1);
    assert_eq!(coord.sessions()[0].launch_mode, LaunchMode::Continue);
}

#[test]
fn test_surfaces_get_launch_command_and_directory() {
    let surfaces = MockSurfaces::default();
    let mut coord = coordinator(&surfaces);
    let project = Project::new("/work/app");

    coord.launch(&project, LaunchMode::Continue);
    coord.teleport("abc-123");

    let log = surfaces.log.lock();
    assert_eq!(
        log.created,
        vec![
            (PathBuf::from("/work/app"), "claude --continue".to_string()),
            (PathBuf::from("/work/app"), "claude --resume abc-123".to_string()),
        ]
    );
}

#[test]
fn test_close_destroys_surface_and_returns_to_launcher() {
    let surfaces = MockSurfaces::default();
    let mut coord = coordinator(&surfaces);
    let catalog = projects(3);
    for project in &catalog {
        coord.launch(project, LaunchMode::Continue);
    }

    let surface = coord.sessions()[1].surface.unwrap();
    coord.close(1);

    assert_eq!(surfaces.log.lock().destroyed, vec![surface]);
    assert_eq!(coord.mode(), Mode::Launcher);
    assert_eq!(coord.activation_order(), &[catalog[0].id, catalog[2].id]);
    // Selection was on the last tab and stays on what is now the last tab
    assert_eq!(coord.selected_index(), Some(1));
    assert_eq!(coord.selected_session().unwrap().project.id, catalog[2].id);
}

#[test]
fn test_surface_failure_still_opens_session() {
    let surfaces = MockSurfaces::default();
    *surfaces.fail.lock() = true;
    let mut coord = coordinator(&surfaces);

    coord.launch(&Project::new("/work/app"), LaunchMode::Continue);
    assert_eq!(coord.session_count(), 1);
    assert_eq!(coord.mode(), Mode::Session);
    assert!(coord.selected_session().unwrap().surface.is_none());

    // Nothing to tear down on close
    coord.close(0);
    assert!(surfaces.log.lock().destroyed.is_empty());
    assert!(coord.is_empty());
}

#[test]
fn test_closing_everything_resets_state() {
    let surfaces = MockSurfaces::default();
    let mut coord = coordinator(&surfaces);
    for project in &projects(4) {
        coord.launch(project, LaunchMode::Continue);
    }

    while !coord.is_empty() {
        coord.close(0);
    }

    assert_eq!(coord.selected_index(), None);
    assert!(coord.current_project().is_none());
    assert!(coord.activation_order().is_empty());
    assert_eq!(surfaces.log.lock().destroyed.len(), 4);

    // Teleport has nothing to attach to now
    coord.teleport("abc");
    assert!(coord.is_empty());
}
