//! deck-shell - Entry Point
//!
//! Headless driver for the session core. Project directories given on the
//! command line form the catalog; commands are read line by line from stdin
//! and every published status snapshot is logged.

use anyhow::{bail, Context, Result};
use deck_shell::{
    app::App,
    core::{
        archive::TaskArchive,
        config::Config,
        events::{AppEvent, Command},
        project::Project,
        sessions::SessionCoordinator,
        snapshot::SessionStateSnapshot,
        surface::LaunchMode,
    },
    pty::PtySurfaceFactory,
    watcher::{StateWatcher, WatcherConfig, WatcherUpdate},
};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// A parsed stdin line
#[derive(Debug)]
enum Line {
    Run(Command),
    Archive(String),
    Unarchive(String),
    Status,
    Quit,
}

fn parse_line(line: &str, catalog: &[Project]) -> Result<Line> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        bail!("empty command");
    };

    let index = |arg: Option<&str>| -> Result<usize> {
        arg.context("missing index")?
            .parse::<usize>()
            .context("index must be a number")
    };

    let line = match verb {
        "launch" => {
            let n = index(parts.next())?;
            let project = catalog
                .get(n)
                .with_context(|| format!("no project #{}", n))?
                .clone();
            let mode = match parts.next() {
                None | Some("continue") => LaunchMode::Continue,
                Some("fresh") => LaunchMode::Fresh,
                Some("resume") => LaunchMode::Resume(
                    parts.next().context("resume needs a session ID")?.to_string(),
                ),
                Some(other) => bail!("unknown launch mode {:?}", other),
            };
            Line::Run(Command::Launch { project, mode })
        }
        "switch" => Line::Run(Command::SwitchTo(index(parts.next())?)),
        "next" => Line::Run(Command::Next),
        "prev" => Line::Run(Command::Previous),
        "close" => Line::Run(Command::Close(index(parts.next())?)),
        "home" => Line::Run(Command::ReturnToLauncher),
        "teleport" => Line::Run(Command::Teleport(
            parts.next().context("teleport needs a session ID")?.to_string(),
        )),
        "archive" => Line::Archive(parts.next().context("archive needs a session ID")?.to_string()),
        "unarchive" => Line::Unarchive(parts.next().context("unarchive needs a session ID")?.to_string()),
        "status" => Line::Status,
        "quit" | "exit" => Line::Quit,
        other => bail!("unknown command {:?}", other),
    };
    Ok(line)
}

fn log_snapshot(snapshot: &SessionStateSnapshot) {
    let (done, total) = snapshot.todo_counts();
    info!(
        project = %snapshot.project,
        model = %snapshot.model,
        context = snapshot.context_percent,
        usage = snapshot.usage_percent,
        branch = %snapshot.git.branch,
        todos = %format!("{}/{}", done, total),
        "Status updated at {}",
        snapshot.timestamp
    );
}

fn log_status(app: &App, catalog: &[Project]) {
    let view = app.coordinator().view();
    info!("Mode: {:?}, selected: {:?}", view.mode, view.selected_index);
    for (i, project) in catalog.iter().enumerate() {
        info!("  project #{}: {} ({})", i, project.name, project.display_path());
    }
    for (i, session) in view.sessions.iter().enumerate() {
        info!(
            "  tab {}: {} (session {}, surface: {}, active: {}{})",
            i,
            session.project_name,
            session.id,
            session.has_surface,
            session.is_active,
            if session.teleported { ", teleported" } else { "" }
        );
    }
    info!("  watcher: {:?} {:?}", app.watcher().phase(), app.watcher().watched_path());
    for task in app.visible_background_tasks() {
        info!("  background task {}: {} {}", task.session_id, task.description, task.url);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting deck-shell");

    let config = Config::load()?;
    info!("Configuration loaded, state directory {:?}", config.watcher.state_dir);

    let catalog: Vec<Project> = std::env::args()
        .skip(1)
        .map(PathBuf::from)
        .map(|path| std::fs::canonicalize(&path).unwrap_or(path))
        .map(Project::new)
        .collect();
    if catalog.is_empty() {
        warn!("No project directories given; pass them as arguments");
    }

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<AppEvent>();
    let (update_tx, mut update_rx) = mpsc::unbounded_channel::<WatcherUpdate>();

    let coordinator = SessionCoordinator::new(
        Box::new(PtySurfaceFactory::new(event_tx)),
        config.claude.clone(),
    );
    let watcher = StateWatcher::new(
        config.watcher.state_dir.clone(),
        WatcherConfig::from(&config.watcher),
        update_tx,
    );
    let archive = TaskArchive::load_from(config.archive.path.clone())?;
    let mut app = App::new(coordinator, watcher, archive);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    // Single mutation thread: everything touching `app` happens in this loop
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_line(&line, &catalog) {
                    Ok(Line::Run(command)) => app.dispatch(command),
                    Ok(Line::Archive(id)) => {
                        if let Err(e) = app.archive_task(&id) {
                            error!("Failed to archive {}: {:#}", id, e);
                        }
                    }
                    Ok(Line::Unarchive(id)) => {
                        if let Err(e) = app.unarchive_task(&id) {
                            error!("Failed to unarchive {}: {:#}", id, e);
                        }
                    }
                    Ok(Line::Status) => log_status(&app, &catalog),
                    Ok(Line::Quit) => break,
                    Err(e) => warn!("{:#}", e),
                }
            }
            Some(update) = update_rx.recv() => {
                if app.apply_update(update) {
                    log_snapshot(&app.snapshot());
                }
            }
            Some(event) = event_rx.recv() => app.handle_event(event),
        }
    }

    info!("Shutting down");
    Ok(())
}
