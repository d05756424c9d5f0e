//! Session state snapshot
//!
//! The parsed form of one status artifact written by the Claude Code status
//! hook. Every field except `timestamp` is optional on the wire and falls back
//! to a neutral value; a document that is not a JSON object, or whose fields
//! have the wrong shape, is rejected as a whole.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Why an artifact could not be turned into a snapshot
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The artifact could not be read from disk
    #[error("failed to read status artifact: {0}")]
    Read(#[from] std::io::Error),
    /// The artifact is not a valid snapshot document
    #[error("malformed status artifact: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Status of a todo item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

/// A todo item from the assistant's task list
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    #[serde(default, deserialize_with = "null_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_default")]
    pub status: TodoStatus,
    /// Present-tense label shown while the item is in progress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_form: Option<String>,
}

impl Todo {
    /// Label to display for this item, preferring the active form while in progress
    pub fn display_text(&self) -> &str {
        match (&self.status, self.active_form.as_deref()) {
            (TodoStatus::InProgress, Some(active)) if !active.is_empty() => active,
            _ => &self.content,
        }
    }
}

/// State of a pull request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestState {
    #[default]
    #[serde(alias = "OPEN")]
    Open,
    #[serde(alias = "CLOSED")]
    Closed,
    #[serde(alias = "MERGED")]
    Merged,
}

/// Summary of a pull request on the project's repository
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    #[serde(default, deserialize_with = "null_default")]
    pub number: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_default")]
    pub author: String,
    #[serde(default, alias = "isDraft", deserialize_with = "null_default")]
    pub draft: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub state: PullRequestState,
    /// Empty or unparseable values read as not closed
    #[serde(
        default,
        deserialize_with = "optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub closed_at: Option<DateTime<Utc>>,
}

/// A background (remote) task attached to the session
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundTask {
    #[serde(default, deserialize_with = "null_default")]
    pub session_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_default")]
    pub url: String,
}

/// Token breakdown of the most recent API call
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUsage {
    #[serde(default, deserialize_with = "null_default")]
    pub input_tokens: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub output_tokens: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub cache_creation_input_tokens: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub cache_read_input_tokens: u64,
}

impl CurrentUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens
            + self.output_tokens
            + self.cache_creation_input_tokens
            + self.cache_read_input_tokens
    }
}

/// Context window usage
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextUsage {
    #[serde(default, deserialize_with = "null_default")]
    pub total_input_tokens: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub total_output_tokens: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub context_window_size: u64,
    #[serde(default, deserialize_with = "percent")]
    pub used_percent: f64,
    #[serde(default, deserialize_with = "percent")]
    pub remaining_percent: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub current_usage: CurrentUsage,
}

/// Git working tree summary
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitSummary {
    #[serde(default, deserialize_with = "null_default")]
    pub branch: String,
    #[serde(default, deserialize_with = "null_default")]
    pub uncommitted: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub ahead: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub behind: u32,
}

/// Parsed contents of one status artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStateSnapshot {
    /// When the producer wrote the artifact (required)
    #[serde(deserialize_with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_default")]
    pub project: String,
    #[serde(default, deserialize_with = "null_default")]
    pub model: String,
    #[serde(default, deserialize_with = "null_default")]
    pub version: String,
    #[serde(default, deserialize_with = "null_default")]
    pub cwd: String,
    /// Headline context usage (0-100)
    #[serde(default, deserialize_with = "percent")]
    pub context_percent: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub context: ContextUsage,
    /// Plan quota usage (0-100)
    #[serde(default, deserialize_with = "percent")]
    pub usage_percent: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub git: GitSummary,
    #[serde(default, deserialize_with = "null_default")]
    pub todos: Vec<Todo>,
    #[serde(default, deserialize_with = "null_default")]
    pub pull_requests: Vec<PullRequest>,
    #[serde(default, deserialize_with = "null_default")]
    pub background_tasks: Vec<BackgroundTask>,
}

impl Default for SessionStateSnapshot {
    fn default() -> Self {
        Self {
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            project: String::new(),
            model: String::new(),
            version: String::new(),
            cwd: String::new(),
            context_percent: 0.0,
            context: ContextUsage::default(),
            usage_percent: 0.0,
            git: GitSummary::default(),
            todos: Vec::new(),
            pull_requests: Vec::new(),
            background_tasks: Vec::new(),
        }
    }
}

impl SessionStateSnapshot {
    /// Create an empty snapshot (nothing parsed yet)
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if this is still the placeholder snapshot
    pub fn is_empty(&self) -> bool {
        self.timestamp == DateTime::<Utc>::UNIX_EPOCH && self.project.is_empty() && self.model.is_empty()
    }

    /// The todo currently being worked on, if any
    pub fn active_todo(&self) -> Option<&Todo> {
        self.todos.iter().find(|t| t.status == TodoStatus::InProgress)
    }

    /// Count todos as (completed, total)
    pub fn todo_counts(&self) -> (usize, usize) {
        let done = self
            .todos
            .iter()
            .filter(|t| t.status == TodoStatus::Completed)
            .count();
        (done, self.todos.len())
    }

    pub fn open_pull_requests(&self) -> impl Iterator<Item = &PullRequest> {
        self.pull_requests
            .iter()
            .filter(|pr| pr.state == PullRequestState::Open)
    }
}

/// Parse an artifact document.
///
/// All-or-nothing: either the whole document deserializes or an error is
/// returned and the caller keeps whatever it had before.
pub fn parse_snapshot(content: &str) -> Result<SessionStateSnapshot, ArtifactError> {
    Ok(serde_json::from_str(content)?)
}

/// Clamp a percentage into [0, 100]
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn percent<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?
        .map(clamp_percent)
        .unwrap_or(0.0))
}

/// Timestamp as producers write it: RFC 3339 text or Unix epoch seconds
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Seconds(i64),
    Fractional(f64),
}

impl RawTimestamp {
    fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            RawTimestamp::Text(s) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            RawTimestamp::Seconds(secs) => Utc.timestamp_opt(*secs, 0).single(),
            RawTimestamp::Fractional(secs) => {
                let whole = secs.trunc() as i64;
                let nanos = (secs.fract() * 1e9) as u32;
                Utc.timestamp_opt(whole, nanos).single()
            }
        }
    }
}

fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    RawTimestamp::deserialize(deserializer)?
        .to_datetime()
        .ok_or_else(|| serde::de::Error::custom("invalid timestamp"))
}

/// Like `timestamp`, but null, empty and unparseable values become None
fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawTimestamp>::deserialize(deserializer)?.and_then(|raw| raw.to_datetime()))
}
