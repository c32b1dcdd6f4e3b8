//! Session state machine.
//!
//! [`SessionEngine`] owns the client-side view of one tracked work session.
//! Commands (`start`, `pause`, `resume`, `stop`) are guarded against invalid
//! transitions before any remote call is made, delegate to the
//! [`SessionService`](crate::services::SessionService), and re-poll status
//! afterwards. The client never transitions optimistically: display state is
//! always derived from the last status the remote side reported.
//!
//! # Known race
//!
//! Pollers and commands write into the same status cell without request
//! sequencing. A poll that was issued before a command but resolves after
//! it can briefly overwrite the command's result; the next poll corrects
//! it. The last applied write wins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::accumulator::total_today_ms;
use crate::backend::MemoryBackend;
use crate::binding::{local_task_id, resolve_start_binding};
use crate::clock::Clock;
use crate::screenshots::{
    estimate_from_interval, fetch_local_count, fetch_server_count, ScreenshotCounters,
};
use crate::services::{
    ConfigService, DailyDurationService, LocalScreenshotStore, ScreenshotCountService,
    ServiceError, SessionService, TaskService,
};
use crate::{RemoteConfig, SessionState, SessionStatus, Task, TaskBinding};

pub mod poller;
pub mod stop_flow;

pub use poller::{PollIntervals, PollerSet};
pub use stop_flow::{StopOutcome, TitlePrompt};

#[cfg(test)]
mod tests;

/// Capacity of the engine event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Errors returned by engine commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A collaborator rejected or failed the command.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The engine was torn down; nothing is applied any more.
    #[error("Session engine has been torn down")]
    TornDown,
}

/// Result of a state machine command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The remote call succeeded and the new status was applied.
    Applied,
    /// The command is not valid in the current state; no remote call made.
    Skipped(&'static str),
}

/// Notifications broadcast to engine subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A new remote status was applied.
    StatusChanged(SessionStatus),
    /// An operational error was surfaced; the message is the remote one.
    Error(String),
    /// The stop flow paused the session and is waiting for a title.
    SavePromptOpened {
        /// Text the prompt should be pre-filled with.
        prefill: String,
    },
    /// The title prompt was confirmed or cancelled.
    SavePromptClosed,
    /// A session was stopped with its final title.
    SessionSaved {
        /// Title the session was saved under.
        title: String,
    },
}

/// The set of collaborators an engine talks to.
#[derive(Clone)]
pub struct Collaborators {
    /// Remote session record.
    pub sessions: Arc<dyn SessionService>,
    /// Task list.
    pub tasks: Arc<dyn TaskService>,
    /// Screenshots stored on this device.
    pub local_screenshots: Arc<dyn LocalScreenshotStore>,
    /// Remote "today" screenshot count.
    pub screenshot_count: Arc<dyn ScreenshotCountService>,
    /// Remote daily duration aggregate.
    pub daily_duration: Arc<dyn DailyDurationService>,
    /// Remote configuration.
    pub config: Arc<dyn ConfigService>,
    /// Local wall clock.
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Wires every collaborator to the same in-memory backend.
    pub fn from_memory(backend: MemoryBackend, clock: Arc<dyn Clock>) -> Self {
        let backend = Arc::new(backend);
        Self {
            sessions: backend.clone(),
            tasks: backend.clone(),
            local_screenshots: backend.clone(),
            screenshot_count: backend.clone(),
            daily_duration: backend.clone(),
            config: backend,
            clock,
        }
    }
}

/// The explicit "paused for save" sub-state of the stop flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSave {
    /// Text the title prompt is pre-filled with.
    pub prefill: String,
    /// Whether the stop flow itself issued the pause.
    pub paused_by_flow: bool,
}

/// Everything a UI needs to render the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSnapshot {
    /// Last applied remote status.
    pub status: SessionStatus,
    /// Session-scoped screenshot counters.
    pub counters: ScreenshotCounters,
    /// Screenshots today, reconciled.
    pub screenshots_today: u64,
    /// Screenshots expected from elapsed time and the configured interval.
    pub estimated_screenshots: Option<u64>,
    /// Sessions completed earlier today.
    pub completed_today_ms: u64,
    /// Completed sessions plus the live one.
    pub total_today_ms: u64,
    /// Task chosen for the next start.
    pub selected_task: Option<i64>,
    /// Binding resolved for the current session.
    pub binding: Option<TaskBinding>,
    /// Latest task list.
    pub tasks: Vec<Task>,
    /// Remote configuration read at mount.
    pub remote_config: RemoteConfig,
    /// Last operational error, cleared by the next successful command.
    pub last_error: Option<String>,
    /// Set while the stop flow waits for a title.
    pub pending_save: Option<PendingSave>,
}

#[derive(Debug, Default)]
struct EngineState {
    status: SessionStatus,
    counters: ScreenshotCounters,
    completed_today_ms: u64,
    remote_config: RemoteConfig,
    tasks: Vec<Task>,
    selected_task: Option<i64>,
    binding: Option<TaskBinding>,
    last_error: Option<String>,
    pending_save: Option<PendingSave>,
}

/// Client-side controller of a single tracked work session.
///
/// Cloning is cheap; clones share state, which is how pollers hold on to
/// the engine.
#[derive(Clone)]
pub struct SessionEngine {
    services: Collaborators,
    state: Arc<RwLock<EngineState>>,
    mounted: Arc<AtomicBool>,
    events: broadcast::Sender<EngineEvent>,
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEngine")
            .field("state", &self.state)
            .field("mounted", &self.mounted)
            .field("subscriber_count", &self.events.receiver_count())
            .finish_non_exhaustive()
    }
}

impl SessionEngine {
    /// Creates an engine over `services`. The engine starts mounted with a
    /// zeroed, stopped status; call [`mount`](Self::mount) to load data.
    pub fn new(services: Collaborators) -> Self {
        let (events, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (shutdown_tx, _rx) = broadcast::channel(1);
        Self {
            services,
            state: Arc::new(RwLock::new(EngineState::default())),
            mounted: Arc::new(AtomicBool::new(true)),
            events,
            shutdown_tx,
        }
    }

    /// Subscribes to engine notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Returns `false` once the engine has been torn down.
    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    pub(crate) fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    fn emit(&self, event: EngineEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("no subscribers for engine event");
        }
    }

    /// Loads everything the tracker shows while idle: remote config, status,
    /// tasks, today's total, and both screenshot counts.
    pub async fn mount(&self) -> Result<(), EngineError> {
        if !self.is_mounted() {
            return Err(EngineError::TornDown);
        }
        let remote_config = match self.services.config.get().await {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "remote config unavailable, using defaults");
                RemoteConfig::default()
            }
        };
        let server = fetch_server_count(self.services.screenshot_count.as_ref()).await;
        let local = fetch_local_count(
            self.services.local_screenshots.as_ref(),
            self.services.clock.today(),
        )
        .await;

        if let Some(mut state) = self.write_if_mounted().await {
            state.remote_config = remote_config;
            let local = local.unwrap_or(state.counters.local_count_now);
            state.counters.fix_baseline(server, local);
        }

        self.refresh_status().await;
        self.refresh_tasks().await;
        self.refresh_daily_total().await;
        info!("session engine mounted");
        Ok(())
    }

    /// Stops the pollers and discards any write that arrives afterwards.
    pub fn teardown(&self) {
        if self.mounted.swap(false, Ordering::SeqCst) {
            let _ = self.shutdown_tx.send(());
            info!("session engine torn down");
        }
    }

    /// Write access to engine state, or `None` after teardown.
    async fn write_if_mounted(&self) -> Option<tokio::sync::RwLockWriteGuard<'_, EngineState>> {
        let guard = self.state.write().await;
        if self.is_mounted() {
            Some(guard)
        } else {
            debug!("discarding state write after teardown");
            None
        }
    }

    /// Current view of the tracker.
    pub async fn snapshot(&self) -> EngineSnapshot {
        let state = self.state.read().await;
        EngineSnapshot {
            status: state.status.clone(),
            counters: state.counters,
            screenshots_today: state.counters.display_total(),
            estimated_screenshots: estimate_from_interval(
                &state.status,
                state.remote_config.screenshot_interval_ms,
            ),
            completed_today_ms: state.completed_today_ms,
            total_today_ms: total_today_ms(state.completed_today_ms, &state.status),
            selected_task: state.selected_task,
            binding: state.binding.clone(),
            tasks: state.tasks.clone(),
            remote_config: state.remote_config,
            last_error: state.last_error.clone(),
            pending_save: state.pending_save.clone(),
        }
    }

    /// Last applied remote status.
    pub async fn status(&self) -> SessionStatus {
        self.state.read().await.status.clone()
    }

    /// Chooses the task the next `start` binds to; `None` means auto-track.
    pub async fn select_task(&self, task_id: Option<i64>) {
        if let Some(mut state) = self.write_if_mounted().await {
            state.selected_task = task_id;
        }
    }

    /// Applies a status reported by the session service.
    ///
    /// Returns `false` when the write was discarded after teardown.
    pub(crate) async fn apply_status(&self, status: SessionStatus) -> bool {
        let Some(mut state) = self.write_if_mounted().await else {
            return false;
        };
        let dropped_save =
            status.state == SessionState::Stopped && state.pending_save.take().is_some();
        if dropped_save {
            debug!("session stopped elsewhere, dropping pending save");
        }
        let changed = state.status != status;
        if changed {
            debug!(state = %status.state, elapsed_ms = status.elapsed_ms, "status applied");
            state.status = status.clone();
        }
        drop(state);
        if dropped_save {
            self.emit(EngineEvent::SavePromptClosed);
        }
        if changed {
            self.emit(EngineEvent::StatusChanged(status));
        }
        true
    }

    /// Re-reads remote status. Returns the applied status, if any.
    pub async fn refresh_status(&self) -> Option<SessionStatus> {
        match self.services.sessions.status().await {
            Ok(status) => {
                if self.apply_status(status.clone()).await {
                    Some(status)
                } else {
                    None
                }
            }
            Err(e) => {
                warn!(error = %e, "status poll failed");
                None
            }
        }
    }

    /// Re-reads the task list; keeps the previous list on failure.
    pub async fn refresh_tasks(&self) {
        match self.services.tasks.all().await {
            Ok(tasks) => {
                if let Some(mut state) = self.write_if_mounted().await {
                    state.tasks = tasks;
                }
            }
            Err(e) => warn!(error = %e, "task list refresh failed"),
        }
    }

    /// Re-reads today's completed duration; keeps the last value on failure.
    pub async fn refresh_daily_total(&self) {
        match self.services.daily_duration.today_total_duration_ms().await {
            Ok(ms) => {
                if let Some(mut state) = self.write_if_mounted().await {
                    state.completed_today_ms = ms;
                }
            }
            Err(e) => warn!(error = %e, "daily total refresh failed, keeping last value"),
        }
    }

    /// Re-samples today's local capture count.
    pub async fn refresh_local_count(&self) {
        let today = self.services.clock.today();
        if let Some(count) = fetch_local_count(self.services.local_screenshots.as_ref(), today).await
        {
            if let Some(mut state) = self.write_if_mounted().await {
                state.counters.observe_local(count);
            }
        }
    }

    /// Re-fetches the remote screenshot count while no session is live.
    ///
    /// During a session the count stays fixed at its start value.
    pub async fn refresh_server_count(&self) {
        if self.state.read().await.status.is_live() {
            return;
        }
        let count = fetch_server_count(self.services.screenshot_count.as_ref()).await;
        if let Some(mut state) = self.write_if_mounted().await {
            if !state.status.is_live() {
                state.counters.server_count_at_start = count;
            }
        }
    }

    /// Records an operational error for the user-visible error channel.
    async fn surface(&self, err: &ServiceError) {
        warn!(error = %err, "session command failed");
        if let Some(mut state) = self.write_if_mounted().await {
            state.last_error = Some(err.to_string());
        }
        self.emit(EngineEvent::Error(err.to_string()));
    }

    async fn clear_error(&self) {
        if let Some(mut state) = self.write_if_mounted().await {
            state.last_error = None;
        }
    }

    fn ensure_mounted(&self) -> Result<(), EngineError> {
        if self.is_mounted() {
            Ok(())
        } else {
            Err(EngineError::TornDown)
        }
    }

    /// Starts a session, optionally bound to `task_id` (falling back to the
    /// selected task) or to a caller-supplied manual title.
    ///
    /// Screenshot baselines are fixed before the remote call and restored if
    /// it fails, so a failed start leaves the tracker exactly as it was.
    pub async fn start(
        &self,
        task_id: Option<i64>,
        manual_title: Option<&str>,
    ) -> Result<CommandOutcome, EngineError> {
        self.ensure_mounted()?;
        let (selected, tasks) = {
            let state = self.state.read().await;
            if state.pending_save.is_some() {
                return Ok(CommandOutcome::Skipped("a stop is waiting for a title"));
            }
            if state.status.state != SessionState::Stopped {
                return Ok(CommandOutcome::Skipped("a session is already in progress"));
            }
            (state.selected_task, state.tasks.clone())
        };

        let server = fetch_server_count(self.services.screenshot_count.as_ref()).await;
        let local = fetch_local_count(
            self.services.local_screenshots.as_ref(),
            self.services.clock.today(),
        )
        .await;
        let previous_counters = {
            let Some(mut state) = self.write_if_mounted().await else {
                return Err(EngineError::TornDown);
            };
            let previous = state.counters;
            let local = local.unwrap_or(previous.local_count_now);
            state.counters.fix_baseline(server, local);
            previous
        };

        let now = self.services.clock.now();
        let binding = resolve_start_binding(
            task_id.or(selected),
            manual_title,
            &tasks,
            local_task_id(now),
        );
        let remote_title = binding.is_manual.then(|| binding.title.clone());

        match self
            .services
            .sessions
            .start(binding.task_id, remote_title)
            .await
        {
            Ok(status) => {
                info!(
                    task_id = ?binding.task_id,
                    manual = binding.is_manual,
                    title = %binding.title,
                    "session started"
                );
                if let Some(mut state) = self.write_if_mounted().await {
                    state.selected_task = binding.task_id;
                    state.binding = Some(binding);
                }
                self.clear_error().await;
                self.apply_status(status).await;
                self.refresh_status().await;
                self.refresh_tasks().await;
                Ok(CommandOutcome::Applied)
            }
            Err(e) => {
                if let Some(mut state) = self.write_if_mounted().await {
                    state.counters = previous_counters;
                }
                self.surface(&e).await;
                Err(e.into())
            }
        }
    }

    /// Pauses a running session.
    pub async fn pause(&self) -> Result<CommandOutcome, EngineError> {
        self.ensure_mounted()?;
        {
            let state = self.state.read().await;
            if state.pending_save.is_some() {
                return Ok(CommandOutcome::Skipped("a stop is waiting for a title"));
            }
            if state.status.state != SessionState::Running {
                return Ok(CommandOutcome::Skipped("session is not running"));
            }
        }
        self.remote_pause().await.map(|_| CommandOutcome::Applied)
    }

    /// Resumes a paused session.
    pub async fn resume(&self) -> Result<CommandOutcome, EngineError> {
        self.ensure_mounted()?;
        {
            let state = self.state.read().await;
            if state.pending_save.is_some() {
                return Ok(CommandOutcome::Skipped("a stop is waiting for a title"));
            }
            if state.status.state != SessionState::Paused {
                return Ok(CommandOutcome::Skipped("session is not paused"));
            }
        }
        self.remote_resume().await.map(|_| CommandOutcome::Applied)
    }

    /// Stops the session with an already finalized title.
    ///
    /// Use [`begin_stop`](Self::begin_stop) or
    /// [`request_stop`](Self::request_stop) to run the full stop protocol.
    pub async fn stop(&self, title: &str) -> Result<CommandOutcome, EngineError> {
        self.ensure_mounted()?;
        {
            let state = self.state.read().await;
            if state.pending_save.is_some() {
                return Ok(CommandOutcome::Skipped("a stop is waiting for a title"));
            }
            if state.status.state == SessionState::Stopped {
                return Ok(CommandOutcome::Skipped("no session in progress"));
            }
        }
        self.remote_stop(title.to_string())
            .await
            .map(|_| CommandOutcome::Applied)
    }

    pub(crate) async fn remote_pause(&self) -> Result<(), EngineError> {
        match self.services.sessions.pause().await {
            Ok(status) => {
                info!(elapsed_ms = status.elapsed_ms, "session paused");
                self.clear_error().await;
                self.apply_status(status).await;
                self.refresh_status().await;
                Ok(())
            }
            Err(e) => {
                self.surface(&e).await;
                Err(e.into())
            }
        }
    }

    pub(crate) async fn remote_resume(&self) -> Result<(), EngineError> {
        match self.services.sessions.resume().await {
            Ok(status) => {
                info!("session resumed");
                self.clear_error().await;
                self.apply_status(status).await;
                self.refresh_status().await;
                Ok(())
            }
            Err(e) => {
                self.surface(&e).await;
                Err(e.into())
            }
        }
    }

    /// Remote stop; on success zeroes the session-scoped counters and the
    /// task selection so the next start begins clean.
    pub(crate) async fn remote_stop(&self, title: String) -> Result<(), EngineError> {
        match self.services.sessions.stop(title.clone()).await {
            Ok(status) => {
                info!(title = %title, "session stopped");
                if let Some(mut state) = self.write_if_mounted().await {
                    state.counters.reset();
                    state.selected_task = None;
                    state.binding = None;
                    state.pending_save = None;
                    state.last_error = None;
                }
                self.apply_status(status).await;
                self.refresh_server_count().await;
                self.emit(EngineEvent::SessionSaved { title });
                self.refresh_status().await;
                self.refresh_daily_total().await;
                self.refresh_tasks().await;
                Ok(())
            }
            Err(e) => {
                self.surface(&e).await;
                Err(e.into())
            }
        }
    }

    /// Binding of the current session: the locally resolved one, else the
    /// one reported by the remote status.
    pub(crate) async fn current_binding(&self) -> Option<TaskBinding> {
        let state = self.state.read().await;
        state
            .binding
            .clone()
            .or_else(|| state.status.current_binding.clone())
    }

    pub(crate) async fn set_pending_save(&self, pending: Option<PendingSave>) {
        if let Some(mut state) = self.write_if_mounted().await {
            state.pending_save = pending;
        }
    }

    pub(crate) async fn pending_save(&self) -> Option<PendingSave> {
        self.state.read().await.pending_save.clone()
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.services.clock.as_ref()
    }

    pub(crate) fn emit_event(&self, event: EngineEvent) {
        self.emit(event);
    }
}
