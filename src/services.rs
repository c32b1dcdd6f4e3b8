//! Contracts for the remote and local collaborators the engine consumes.
//!
//! Every method returns a boxed future so the engine can hold collaborators
//! as trait objects. Any call may fail with a [`ServiceError`] whose message
//! is surfaced to the user verbatim; the engine never retries.

use futures::future::BoxFuture;
use thiserror::Error;

use crate::{RemoteConfig, ScreenshotRecord, SessionStatus, Task};

/// Errors reported by collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The remote side rejected or failed the request.
    #[error("{0}")]
    Remote(String),

    /// The caller is not signed in.
    #[error("Not authenticated")]
    Unauthenticated,

    /// A local resource could not be read.
    #[error("Local store error: {0}")]
    Local(String),
}

/// Result alias for collaborator calls.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Remote session record: start, pause, resume, stop and status.
pub trait SessionService: Send + Sync {
    /// Opens a session, optionally bound to an existing task.
    fn start(
        &self,
        task_id: Option<i64>,
        manual_title: Option<String>,
    ) -> BoxFuture<'_, ServiceResult<SessionStatus>>;

    /// Freezes elapsed time.
    fn pause(&self) -> BoxFuture<'_, ServiceResult<SessionStatus>>;

    /// Resumes a paused session.
    fn resume(&self) -> BoxFuture<'_, ServiceResult<SessionStatus>>;

    /// Closes the session with a final title.
    fn stop(&self, title: String) -> BoxFuture<'_, ServiceResult<SessionStatus>>;

    /// Idempotent read of the current session.
    fn status(&self) -> BoxFuture<'_, ServiceResult<SessionStatus>>;
}

/// Read-only task list.
pub trait TaskService: Send + Sync {
    /// All tasks visible to the user.
    fn all(&self) -> BoxFuture<'_, ServiceResult<Vec<Task>>>;
}

/// Screenshots stored on this device.
pub trait LocalScreenshotStore: Send + Sync {
    /// Every stored capture; the engine filters by calendar day itself.
    fn all(&self) -> BoxFuture<'_, ServiceResult<Vec<ScreenshotRecord>>>;
}

/// Remote authoritative screenshot count.
pub trait ScreenshotCountService: Send + Sync {
    /// Screenshots the backend holds for "today".
    fn today_count(&self) -> BoxFuture<'_, ServiceResult<u64>>;
}

/// Remote daily duration aggregate.
pub trait DailyDurationService: Send + Sync {
    /// Sum of sessions completed earlier today, in milliseconds.
    fn today_total_duration_ms(&self) -> BoxFuture<'_, ServiceResult<u64>>;
}

/// Remote configuration.
pub trait ConfigService: Send + Sync {
    /// Current remote configuration.
    fn get(&self) -> BoxFuture<'_, ServiceResult<RemoteConfig>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_displays_message_verbatim() {
        let err = ServiceError::Remote("Task is archived".to_string());
        assert_eq!(err.to_string(), "Task is archived");
    }

    #[test]
    fn local_error_display_mentions_store() {
        let err = ServiceError::Local("disk full".to_string());
        assert!(err.to_string().contains("Local store"));
        assert!(err.to_string().contains("disk full"));
    }
}
