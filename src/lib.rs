//! Worktrack session tracking engine
//!
//! This crate provides the client-side engine of a time-tracking client: the
//! state machine that owns a single tracked work session, the accounting of
//! elapsed and paused time, the reconciliation of local and remote
//! screenshot counts, task title resolution, and the stop/save protocol.
//!
//! Remote collaborators (session, task, screenshot, duration and config
//! services) are consumed through the traits in [`services`]. An in-process
//! implementation lives in [`backend::memory`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pure time accounting and duration formatting.
pub mod accumulator;

/// In-process collaborator implementations.
pub mod backend;

/// Task identity and title resolution.
pub mod binding;

/// Wall-clock abstraction used for calendar-day and title decisions.
pub mod clock;

/// Configuration utilities including XDG path resolution.
pub mod config;

/// Session state machine, stop flow and pollers.
pub mod engine;

/// Logging initialization.
pub mod logging;

/// Screenshot count reconciliation.
pub mod screenshots;

/// Collaborator contracts consumed by the engine.
pub mod services;

/// Title used for auto-track sessions until a title is chosen at stop time.
pub const DEFAULT_TASK_TITLE: &str = "General Work";

/// Lifecycle state of the remote session record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No session in progress (initial and terminal state).
    #[default]
    Stopped,
    /// Time is accumulating.
    Running,
    /// Session is open but time is frozen.
    Paused,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Stopped => "stopped",
            SessionState::Running => "running",
            SessionState::Paused => "paused",
        };
        write!(f, "{}", s)
    }
}

/// Error type for parsing SessionState from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSessionStateError(pub String);

impl fmt::Display for ParseSessionStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid session state: {}", self.0)
    }
}

impl std::error::Error for ParseSessionStateError {}

impl FromStr for SessionState {
    type Err = ParseSessionStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stopped" => Ok(SessionState::Stopped),
            "running" => Ok(SessionState::Running),
            "paused" => Ok(SessionState::Paused),
            _ => Err(ParseSessionStateError(s.to_string())),
        }
    }
}

/// Identity and title of the task a session is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskBinding {
    /// Server-assigned task id, once one exists.
    pub task_id: Option<i64>,
    /// Client-generated id used before the server assigns one.
    pub task_local_id: Option<String>,
    /// Task title. Immutable for manual tasks.
    pub title: String,
    /// `true` when the task was pre-created by the user as a named task.
    pub is_manual: bool,
}

impl TaskBinding {
    /// Binding to a pre-created, named task.
    pub fn manual(task_id: i64, title: impl Into<String>) -> Self {
        Self {
            task_id: Some(task_id),
            task_local_id: None,
            title: title.into(),
            is_manual: true,
        }
    }

    /// Placeholder binding for a session without a selected task.
    pub fn auto_track(task_local_id: impl Into<String>) -> Self {
        Self {
            task_id: None,
            task_local_id: Some(task_local_id.into()),
            title: DEFAULT_TASK_TITLE.to_string(),
            is_manual: false,
        }
    }
}

/// Session status as reported by the remote session service.
///
/// Refreshed on every poll and after every command. The client never mutates
/// it optimistically; the last applied value is authoritative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Whether a session is open (running or paused).
    pub is_tracking: bool,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Accumulated active time of the current (or just-ended) session.
    pub elapsed_ms: u64,
    /// Accumulated paused time of the current (or just-ended) session.
    pub paused_ms: u64,
    /// Task the session is bound to, if any.
    pub current_binding: Option<TaskBinding>,
}

impl SessionStatus {
    /// The zeroed form reported when no session has ever been started.
    pub fn stopped() -> Self {
        Self::default()
    }

    /// Returns `true` when elapsed time is live (tracking and not stopped).
    pub fn is_live(&self) -> bool {
        self.is_tracking && self.state != SessionState::Stopped
    }
}

/// A task as listed by the task service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Server id.
    pub id: i64,
    /// Stored title.
    pub title: String,
    /// Whether the user created the task by hand.
    pub is_manual: bool,
    /// Total tracked duration, when the service reports it.
    #[serde(default)]
    pub duration_ms: Option<u64>,
    /// Free-form server status (e.g. "open", "done").
    #[serde(default)]
    pub status: Option<String>,
}

/// A screenshot captured and stored on this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotRecord {
    /// Capture moment.
    pub captured_at: chrono::DateTime<chrono::Utc>,
}

/// Remote configuration, read once at mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Interval between background screenshots.
    pub screenshot_interval_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            screenshot_interval_ms: 10 * 60 * 1000,
        }
    }
}

#[cfg(test)]
mod tests;
