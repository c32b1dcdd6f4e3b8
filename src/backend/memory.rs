//! In-memory backend implementing every collaborator contract.
//!
//! The session record is a timeline of lifecycle events folded by the
//! [`accumulator`](crate::accumulator) on every status read, so elapsed and
//! paused time behave exactly as a remote service would report them. Any
//! operation can be made to fail once with [`MemoryBackend::fail_next`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use futures::future::{self, BoxFuture, FutureExt};
use tracing::debug;

use crate::accumulator::{accumulate, EventKind, TimelineEvent};
use crate::clock::Clock;
use crate::services::{
    ConfigService, DailyDurationService, LocalScreenshotStore, ScreenshotCountService,
    ServiceError, ServiceResult, SessionService, TaskService,
};
use crate::{
    RemoteConfig, ScreenshotRecord, SessionState, SessionStatus, Task, TaskBinding,
};

/// Operations the backend serves, used for failure injection and call logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `SessionService::start`
    Start,
    /// `SessionService::pause`
    Pause,
    /// `SessionService::resume`
    Resume,
    /// `SessionService::stop`
    Stop,
    /// `SessionService::status`
    Status,
    /// `TaskService::all`
    Tasks,
    /// `LocalScreenshotStore::all`
    LocalScreenshots,
    /// `ScreenshotCountService::today_count`
    ScreenshotCount,
    /// `DailyDurationService::today_total_duration_ms`
    DailyDuration,
    /// `ConfigService::get`
    Config,
}

#[derive(Debug, Clone, Copy)]
struct CompletedSession {
    ended_on: NaiveDate,
    duration_ms: u64,
}

#[derive(Debug, Default)]
struct Inner {
    timeline: Vec<TimelineEvent>,
    binding: Option<TaskBinding>,
    tasks: Vec<Task>,
    next_task_id: i64,
    completed: Vec<CompletedSession>,
    local_screenshots: Vec<ScreenshotRecord>,
    server_screenshot_count: u64,
    remote_config: RemoteConfig,
    failures: HashMap<Operation, ServiceError>,
    calls: Vec<Operation>,
}

/// Shared in-memory backend. Clones share state.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<Mutex<Inner>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl MemoryBackend {
    /// Creates an empty backend reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_task_id: 1,
                ..Inner::default()
            })),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Makes the next call to `op` fail with `error`.
    pub fn fail_next(&self, op: Operation, error: ServiceError) {
        self.lock().failures.insert(op, error);
    }

    /// Every operation served so far, in call order.
    pub fn calls(&self) -> Vec<Operation> {
        self.lock().calls.clone()
    }

    /// Number of times `op` has been served.
    pub fn call_count(&self, op: Operation) -> usize {
        self.lock().calls.iter().filter(|c| **c == op).count()
    }

    /// Adds a task and returns its id.
    pub fn add_task(&self, title: impl Into<String>, is_manual: bool) -> i64 {
        let mut inner = self.lock();
        let id = inner.next_task_id;
        inner.next_task_id += 1;
        inner.tasks.push(Task {
            id,
            title: title.into(),
            is_manual,
            duration_ms: Some(0),
            status: Some("open".to_string()),
        });
        id
    }

    /// Stores a local capture at the current clock time.
    pub fn capture_screenshot(&self) {
        let captured_at = self.clock.now().with_timezone(&chrono::Utc);
        self.lock()
            .local_screenshots
            .push(ScreenshotRecord { captured_at });
    }

    /// Drops every local capture.
    pub fn clear_local_screenshots(&self) {
        self.lock().local_screenshots.clear();
    }

    /// Sets the remote "today" screenshot count.
    pub fn set_server_screenshot_count(&self, count: u64) {
        self.lock().server_screenshot_count = count;
    }

    /// Records a session completed today that the engine never saw.
    pub fn record_completed_today(&self, duration_ms: u64) {
        let ended_on = self.clock.today();
        self.lock().completed.push(CompletedSession {
            ended_on,
            duration_ms,
        });
    }

    /// Replaces the remote configuration.
    pub fn set_remote_config(&self, config: RemoteConfig) {
        self.lock().remote_config = config;
    }

    /// Logs the call and consumes an injected failure, if any.
    fn enter(inner: &mut Inner, op: Operation) -> ServiceResult<()> {
        inner.calls.push(op);
        match inner.failures.remove(&op) {
            Some(err) => {
                debug!(?op, error = %err, "injected failure");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn snapshot(&self, inner: &Inner) -> SessionStatus {
        let acc = accumulate(&inner.timeline, self.clock.now());
        if acc.state == SessionState::Stopped {
            return SessionStatus::stopped();
        }
        SessionStatus {
            is_tracking: true,
            state: acc.state,
            elapsed_ms: acc.elapsed_ms,
            paused_ms: acc.paused_ms,
            current_binding: inner.binding.clone(),
        }
    }

    fn current_state(&self, inner: &Inner) -> SessionState {
        accumulate(&inner.timeline, self.clock.now()).state
    }

    fn do_start(&self, task_id: Option<i64>, manual_title: Option<String>) -> ServiceResult<SessionStatus> {
        let mut inner = self.lock();
        Self::enter(&mut inner, Operation::Start)?;
        if self.current_state(&inner) != SessionState::Stopped {
            return Err(ServiceError::Remote("A session is already in progress".to_string()));
        }

        let now = self.clock.now();
        let binding = match task_id {
            Some(id) => {
                let task = inner.tasks.iter().find(|t| t.id == id).ok_or_else(|| {
                    ServiceError::Remote(format!("Task {} not found", id))
                })?;
                TaskBinding {
                    task_id: Some(task.id),
                    task_local_id: None,
                    title: task.title.clone(),
                    is_manual: task.is_manual,
                }
            }
            None => match manual_title {
                Some(title) => TaskBinding {
                    task_id: None,
                    task_local_id: Some(crate::binding::local_task_id(now)),
                    title,
                    is_manual: true,
                },
                None => TaskBinding::auto_track(crate::binding::local_task_id(now)),
            },
        };

        inner.timeline = vec![TimelineEvent::new(EventKind::Start, now)];
        inner.binding = Some(binding);
        Ok(self.snapshot(&inner))
    }

    fn do_transition(
        &self,
        op: Operation,
        required: SessionState,
        kind: EventKind,
        rejection: &str,
    ) -> ServiceResult<SessionStatus> {
        let mut inner = self.lock();
        Self::enter(&mut inner, op)?;
        if self.current_state(&inner) != required {
            return Err(ServiceError::Remote(rejection.to_string()));
        }
        let now = self.clock.now();
        inner.timeline.push(TimelineEvent::new(kind, now));
        Ok(self.snapshot(&inner))
    }

    fn do_stop(&self, title: String) -> ServiceResult<SessionStatus> {
        let mut inner = self.lock();
        Self::enter(&mut inner, Operation::Stop)?;
        let now = self.clock.now();
        let acc = accumulate(&inner.timeline, now);
        if acc.state == SessionState::Stopped {
            return Err(ServiceError::Remote("No session in progress".to_string()));
        }

        let binding = inner.binding.take();
        match binding.as_ref().and_then(|b| b.task_id) {
            Some(id) => {
                if let Some(task) = inner.tasks.iter_mut().find(|t| t.id == id) {
                    if !task.is_manual {
                        task.title = title;
                    }
                    task.duration_ms = Some(task.duration_ms.unwrap_or(0) + acc.elapsed_ms);
                }
            }
            None => {
                let id = inner.next_task_id;
                inner.next_task_id += 1;
                let is_manual = binding.as_ref().map(|b| b.is_manual).unwrap_or(false);
                let title = match binding {
                    Some(b) if b.is_manual => b.title,
                    _ => title,
                };
                inner.tasks.push(Task {
                    id,
                    title,
                    is_manual,
                    duration_ms: Some(acc.elapsed_ms),
                    status: Some("done".to_string()),
                });
            }
        }

        inner.completed.push(CompletedSession {
            ended_on: now.date_naive(),
            duration_ms: acc.elapsed_ms,
        });
        inner.timeline.clear();
        Ok(SessionStatus::stopped())
    }

    fn do_status(&self) -> ServiceResult<SessionStatus> {
        let mut inner = self.lock();
        Self::enter(&mut inner, Operation::Status)?;
        Ok(self.snapshot(&inner))
    }

    fn serve<T>(&self, op: Operation, f: impl FnOnce(&Inner) -> T) -> ServiceResult<T> {
        let mut inner = self.lock();
        Self::enter(&mut inner, op)?;
        Ok(f(&inner))
    }
}

impl SessionService for MemoryBackend {
    fn start(
        &self,
        task_id: Option<i64>,
        manual_title: Option<String>,
    ) -> BoxFuture<'_, ServiceResult<SessionStatus>> {
        future::ready(self.do_start(task_id, manual_title)).boxed()
    }

    fn pause(&self) -> BoxFuture<'_, ServiceResult<SessionStatus>> {
        future::ready(self.do_transition(
            Operation::Pause,
            SessionState::Running,
            EventKind::Pause,
            "Session is not running",
        ))
        .boxed()
    }

    fn resume(&self) -> BoxFuture<'_, ServiceResult<SessionStatus>> {
        future::ready(self.do_transition(
            Operation::Resume,
            SessionState::Paused,
            EventKind::Resume,
            "Session is not paused",
        ))
        .boxed()
    }

    fn stop(&self, title: String) -> BoxFuture<'_, ServiceResult<SessionStatus>> {
        future::ready(self.do_stop(title)).boxed()
    }

    fn status(&self) -> BoxFuture<'_, ServiceResult<SessionStatus>> {
        future::ready(self.do_status()).boxed()
    }
}

impl TaskService for MemoryBackend {
    fn all(&self) -> BoxFuture<'_, ServiceResult<Vec<Task>>> {
        future::ready(self.serve(Operation::Tasks, |inner| inner.tasks.clone())).boxed()
    }
}

impl LocalScreenshotStore for MemoryBackend {
    fn all(&self) -> BoxFuture<'_, ServiceResult<Vec<ScreenshotRecord>>> {
        future::ready(self.serve(Operation::LocalScreenshots, |inner| {
            inner.local_screenshots.clone()
        }))
        .boxed()
    }
}

impl ScreenshotCountService for MemoryBackend {
    fn today_count(&self) -> BoxFuture<'_, ServiceResult<u64>> {
        future::ready(self.serve(Operation::ScreenshotCount, |inner| {
            inner.server_screenshot_count
        }))
        .boxed()
    }
}

impl DailyDurationService for MemoryBackend {
    fn today_total_duration_ms(&self) -> BoxFuture<'_, ServiceResult<u64>> {
        let today = self.clock.today();
        future::ready(self.serve(Operation::DailyDuration, |inner| {
            inner
                .completed
                .iter()
                .filter(|c| c.ended_on == today)
                .map(|c| c.duration_ms)
                .sum::<u64>()
        }))
        .boxed()
    }
}

impl ConfigService for MemoryBackend {
    fn get(&self) -> BoxFuture<'_, ServiceResult<RemoteConfig>> {
        future::ready(self.serve(Operation::Config, |inner| inner.remote_config)).boxed()
    }
}
