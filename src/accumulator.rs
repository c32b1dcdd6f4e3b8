//! Time accumulation across pause boundaries.
//!
//! Pure functions only: a timeline of start/pause/resume/stop timestamps is
//! folded into elapsed and paused durations, and millisecond durations are
//! formatted for display. Durations are `u64`, so negative input cannot be
//! constructed; a timeline whose timestamps run backwards is a programmer
//! error and panics.

use chrono::{DateTime, Local};

use crate::{SessionState, SessionStatus};

/// Kind of a timeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Session opened; counters reset to zero.
    Start,
    /// Time stops accumulating as elapsed and starts accumulating as paused.
    Pause,
    /// Time accumulates as elapsed again.
    Resume,
    /// Session closed; counters freeze.
    Stop,
}

/// A single lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineEvent {
    /// What happened.
    pub kind: EventKind,
    /// When it happened.
    pub at: DateTime<Local>,
}

impl TimelineEvent {
    /// Creates an event of `kind` at `at`.
    pub fn new(kind: EventKind, at: DateTime<Local>) -> Self {
        Self { kind, at }
    }
}

/// Result of folding a timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accumulated {
    /// State after the last event.
    pub state: SessionState,
    /// Time spent running since the last `Start`.
    pub elapsed_ms: u64,
    /// Time spent paused since the last `Start`.
    pub paused_ms: u64,
}

/// Folds `events` into elapsed and paused durations as of `now`.
///
/// Only the span after the most recent `Start` counts, so time never carries
/// across a stop into a new session. After a `Stop` both counters are frozen
/// at their final values.
///
/// # Panics
///
/// Panics if event timestamps decrease, or if `now` precedes the last event
/// of an open session.
pub fn accumulate(events: &[TimelineEvent], now: DateTime<Local>) -> Accumulated {
    let mut acc = Accumulated::default();
    let mut last: Option<DateTime<Local>> = None;

    for event in events {
        if let Some(prev) = last {
            acc.add_span(span_ms(prev, event.at));
        }
        match event.kind {
            EventKind::Start => {
                acc = Accumulated {
                    state: SessionState::Running,
                    ..Accumulated::default()
                };
            }
            EventKind::Pause => acc.state = SessionState::Paused,
            EventKind::Resume => acc.state = SessionState::Running,
            EventKind::Stop => acc.state = SessionState::Stopped,
        }
        last = Some(event.at);
    }

    if let Some(prev) = last {
        if acc.state != SessionState::Stopped {
            acc.add_span(span_ms(prev, now));
        }
    }
    acc
}

impl Accumulated {
    fn add_span(&mut self, ms: u64) {
        match self.state {
            SessionState::Running => self.elapsed_ms += ms,
            SessionState::Paused => self.paused_ms += ms,
            SessionState::Stopped => {}
        }
    }
}

fn span_ms(from: DateTime<Local>, to: DateTime<Local>) -> u64 {
    assert!(
        to >= from,
        "timeline timestamps must not run backwards ({} -> {})",
        from,
        to
    );
    (to - from).num_milliseconds() as u64
}

/// Formats `ms` as zero-padded `HH:MM:SS`.
///
/// Hours are not capped: 100 hours renders as `100:00:00`.
pub fn format_hms(ms: u64) -> String {
    let secs = ms / 1000;
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

/// Formats `ms` as `Xh Ym`.
pub fn format_hm(ms: u64) -> String {
    let mins = ms / 60_000;
    format!("{}h {}m", mins / 60, mins % 60)
}

/// Today's total: completed sessions plus the live session, if any.
///
/// Elapsed time of a stopped session is already part of `completed_today_ms`
/// and is not added again.
pub fn total_today_ms(completed_today_ms: u64, status: &SessionStatus) -> u64 {
    if status.is_live() {
        completed_today_ms + status.elapsed_ms
    } else {
        completed_today_ms
    }
}
