//! Configuration management

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Status artifact watcher configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatcherSection {
    /// Directory the status hook writes `project-<name>.json` files into
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    /// Poll interval in milliseconds (also used while searching for the file)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Delay before re-opening the artifact after a rename/delete event
    #[serde(default = "default_rewatch_delay")]
    pub rewatch_delay_ms: u64,
    /// Whether to subscribe to OS file events in addition to polling
    #[serde(default = "default_file_events")]
    pub file_events: bool,
}

fn data_dir() -> PathBuf {
    ProjectDirs::from("com", "deckshell", "DeckShell")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .or_else(|| dirs::home_dir().map(|home| home.join(".deck-shell")))
        .unwrap_or_else(|| PathBuf::from(".deck-shell"))
}

fn default_state_dir() -> PathBuf {
    data_dir().join("state")
}
fn default_poll_interval() -> u64 {
    2000
}
fn default_rewatch_delay() -> u64 {
    50
}
fn default_file_events() -> bool {
    true
}

impl Default for WatcherSection {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            poll_interval_ms: default_poll_interval(),
            rewatch_delay_ms: default_rewatch_delay(),
            file_events: default_file_events(),
        }
    }
}

impl WatcherSection {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn rewatch_delay(&self) -> Duration {
        Duration::from_millis(self.rewatch_delay_ms)
    }
}

/// Claude CLI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaudeConfig {
    /// Path to claude CLI
    #[serde(default = "default_cli_path")]
    pub cli_path: String,
    /// Default arguments for claude CLI
    #[serde(default)]
    pub default_args: Vec<String>,
}

fn default_cli_path() -> String {
    "claude".to_string()
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            cli_path: default_cli_path(),
            default_args: Vec::new(),
        }
    }
}

/// Archived task persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveSection {
    #[serde(default = "default_archive_path")]
    pub path: PathBuf,
}

fn default_archive_path() -> PathBuf {
    data_dir().join("archived-tasks.json")
}

impl Default for ArchiveSection {
    fn default() -> Self {
        Self {
            path: default_archive_path(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub watcher: WatcherSection,
    #[serde(default)]
    pub claude: ClaudeConfig,
    #[serde(default)]
    pub archive: ArchiveSection,
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
            Self::from_toml(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))
        } else {
            // Return default config if file doesn't exist
            Ok(Config::default())
        }
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        // Create parent directories if needed
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "deckshell", "DeckShell")
            .context("Failed to determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Get the default configuration embedded in the binary
    pub fn default_config_str() -> &'static str {
        include_str!("../../config/default.toml")
    }
}
