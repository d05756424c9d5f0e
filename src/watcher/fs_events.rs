//! Classification of OS file events for the status artifact

use notify::event::{EventKind, ModifyKind};

/// What a file event means for the watched artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactEvent {
    /// The file was renamed or removed; the watched inode is stale
    Replaced,
    /// The file's contents or attributes changed in place
    Changed,
    /// Nothing worth reacting to
    Ignored,
}

impl ArtifactEvent {
    pub fn classify(kind: &EventKind) -> Self {
        match kind {
            EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_)) => ArtifactEvent::Replaced,
            EventKind::Modify(_) | EventKind::Create(_) | EventKind::Any => ArtifactEvent::Changed,
            EventKind::Access(_) | EventKind::Other => ArtifactEvent::Ignored,
        }
    }
}
