//! Terminal surface collaborator
//!
//! Sessions never own their terminal. A [`SurfaceFactory`] creates surfaces,
//! owns their lifetime, and hands back an opaque [`SurfaceId`] the session
//! keeps as a lookup key.

use super::config::ClaudeConfig;
use anyhow::Result;
use std::path::Path;

/// Opaque handle to a hosted terminal surface
pub type SurfaceId = u64;

/// How a session's assistant process should start
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchMode {
    /// Continue the most recent conversation in the project
    Continue,
    /// Start a new conversation
    Fresh,
    /// Resume a specific conversation by ID
    Resume(String),
}

/// Initial command sent to a new surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl SurfaceCommand {
    /// Build the CLI invocation for a launch mode
    pub fn for_launch(config: &ClaudeConfig, mode: &LaunchMode) -> Self {
        let program = if config.cli_path.is_empty() {
            "claude".to_string()
        } else {
            config.cli_path.clone()
        };

        let mut args = config.default_args.clone();
        match mode {
            LaunchMode::Continue => args.push("--continue".to_string()),
            LaunchMode::Fresh => {}
            LaunchMode::Resume(id) => {
                args.push("--resume".to_string());
                args.push(id.clone());
            }
        }

        Self { program, args }
    }

    /// Render as a single shell-style command line
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Creates and destroys terminal surfaces
pub trait SurfaceFactory: Send {
    /// Create a process-backed surface running `command` in `working_directory`
    fn create(&mut self, working_directory: &Path, command: &SurfaceCommand) -> Result<SurfaceId>;

    /// Tear down a surface; unknown IDs are ignored
    fn destroy(&mut self, surface: SurfaceId);
}
