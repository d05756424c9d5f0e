//! deck-shell
//!
//! Session core for a multi-pane shell around the Claude Code CLI.
//!
//! # Features
//! - Follows the per-project status artifact written by the Claude Code status hook
//! - Keeps the latest valid status snapshot, never a half-written one
//! - Manages the ordered set of open project sessions and the launcher/session mode
//! - Hosts each session's CLI in its own PTY
//! - Remembers which background tasks the user archived

pub mod app;
pub mod core;
pub mod pty;
pub mod watcher;

pub use app::App;
pub use core::archive::TaskArchive;
pub use core::config::Config;
pub use core::events::{AppEvent, Command, InputEvent};
pub use core::project::{Project, ProjectId};
pub use core::sessions::{Mode, Session, SessionCoordinator, SessionId};
pub use core::snapshot::SessionStateSnapshot;
pub use core::surface::{LaunchMode, SurfaceFactory};
pub use watcher::{StateWatcher, WatchPhase};
