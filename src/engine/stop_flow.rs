//! Stop/save protocol.
//!
//! Manual tasks stop immediately under their stored title. Auto-track
//! sessions are paused first so the displayed time freezes, then wait in the
//! explicit "paused for save" sub-state until the title prompt is confirmed
//! or cancelled. Cancelling resumes a paused session, so closing the prompt
//! never leaves a session stuck paused.
//!
//! While a save is pending, `start`, `pause`, `resume` and `stop` are
//! skipped; only [`confirm_stop`](SessionEngine::confirm_stop) and
//! [`cancel_stop`](SessionEngine::cancel_stop) leave the sub-state.

use futures::future::BoxFuture;
use tracing::{debug, info};

use super::{EngineError, EngineEvent, PendingSave, SessionEngine};
use crate::binding::{plan_stop, resolve_title, StopPlan};
use crate::SessionState;

/// Result of a stop-flow step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// The session was stopped under `title`.
    Stopped {
        /// Final title.
        title: String,
    },
    /// The session is paused and waiting for a title.
    AwaitingTitle {
        /// Text the prompt should be pre-filled with.
        prefill: String,
    },
    /// The prompt was cancelled.
    Cancelled {
        /// Whether tracking was resumed.
        resumed: bool,
    },
    /// Nothing to do in the current state.
    Skipped(&'static str),
}

/// Asks the user for a session title.
pub trait TitlePrompt: Send + Sync {
    /// Shows a prompt pre-filled with `prefill`. `None` means cancelled; an
    /// empty string means "use the default title".
    fn ask<'a>(&'a self, prefill: &'a str) -> BoxFuture<'a, Option<String>>;
}

impl SessionEngine {
    /// First half of the stop protocol.
    ///
    /// Manual tasks with a known title are stopped right away. Everything
    /// else is paused (if running) and parked in the "paused for save"
    /// sub-state, returning [`StopOutcome::AwaitingTitle`]. Calling this again
    /// while a save is pending returns the same prompt.
    ///
    /// If the pause fails the error is surfaced and no prompt is opened.
    pub async fn begin_stop(&self) -> Result<StopOutcome, EngineError> {
        self.ensure_mounted()?;
        if let Some(pending) = self.pending_save().await {
            return Ok(StopOutcome::AwaitingTitle {
                prefill: pending.prefill,
            });
        }

        let status = self.status().await;
        if status.state == SessionState::Stopped {
            return Ok(StopOutcome::Skipped("no session in progress"));
        }

        let binding = self.current_binding().await;
        match plan_stop(binding.as_ref()) {
            StopPlan::Immediate { title } => {
                debug!(title = %title, "manual task, stopping without prompt");
                self.remote_stop(title.clone()).await?;
                Ok(StopOutcome::Stopped { title })
            }
            StopPlan::PromptForTitle { prefill } => {
                let paused_by_flow = status.state == SessionState::Running;
                if paused_by_flow {
                    self.remote_pause().await?;
                }
                self.set_pending_save(Some(PendingSave {
                    prefill: prefill.clone(),
                    paused_by_flow,
                }))
                .await;
                info!(paused_by_flow, "waiting for session title");
                self.emit_event(EngineEvent::SavePromptOpened {
                    prefill: prefill.clone(),
                });
                Ok(StopOutcome::AwaitingTitle { prefill })
            }
        }
    }

    /// Confirms the title prompt and stops the session.
    ///
    /// A blank `input` resolves to the default title generated from the stop
    /// moment. On failure the session stays paused, the selection is kept,
    /// and the prompt remains open for another confirm or a cancel.
    pub async fn confirm_stop(&self, input: &str) -> Result<StopOutcome, EngineError> {
        self.ensure_mounted()?;
        if self.pending_save().await.is_none() {
            return Ok(StopOutcome::Skipped("no stop is waiting for a title"));
        }

        let title = resolve_title(input, self.clock().now());
        self.remote_stop(title.clone()).await?;
        self.emit_event(EngineEvent::SavePromptClosed);
        Ok(StopOutcome::Stopped { title })
    }

    /// Cancels the title prompt.
    ///
    /// Remote status is re-queried (falling back to the last applied one if
    /// the query fails); a paused session is resumed. If the session is no
    /// longer paused, nothing else happens.
    pub async fn cancel_stop(&self) -> Result<StopOutcome, EngineError> {
        self.ensure_mounted()?;
        if self.pending_save().await.is_none() {
            return Ok(StopOutcome::Skipped("no stop is waiting for a title"));
        }
        self.set_pending_save(None).await;
        self.emit_event(EngineEvent::SavePromptClosed);

        let status = match self.refresh_status().await {
            Some(status) => status,
            None => self.status().await,
        };
        if status.state != SessionState::Paused {
            debug!(state = %status.state, "save cancelled, session no longer paused");
            return Ok(StopOutcome::Cancelled { resumed: false });
        }

        self.remote_resume().await?;
        info!("save cancelled, tracking resumed");
        Ok(StopOutcome::Cancelled { resumed: true })
    }

    /// Runs the whole stop protocol, asking `prompt` for the title when one
    /// is needed.
    pub async fn request_stop(&self, prompt: &dyn TitlePrompt) -> Result<StopOutcome, EngineError> {
        match self.begin_stop().await? {
            StopOutcome::AwaitingTitle { prefill } => match prompt.ask(&prefill).await {
                Some(input) => self.confirm_stop(&input).await,
                None => self.cancel_stop().await,
            },
            other => Ok(other),
        }
    }
}
