//! Watcher module - follows the status artifact of the visible session

mod fs_events;
mod state_watcher;

pub use fs_events::ArtifactEvent;
pub use state_watcher::{StateWatcher, WatchError, WatchPhase, WatcherConfig, WatcherUpdate};
