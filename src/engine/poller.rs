//! Periodic refresh of engine state.
//!
//! Three independent cadences run as spawned tasks: remote session status,
//! today's completed duration, and the local screenshot count. Each loop
//! exits when the engine is torn down.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::SessionEngine;
use crate::config::schema::PollingConfig;
use crate::config::ConfigError;

/// Default remote status cadence.
pub const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_secs(1);

/// Default daily duration cadence.
pub const DEFAULT_DAILY_TOTAL_INTERVAL: Duration = Duration::from_secs(5);

/// Default local screenshot count cadence.
pub const DEFAULT_SCREENSHOT_COUNT_INTERVAL: Duration = Duration::from_secs(3);

/// What a poller refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollKind {
    /// Remote session status.
    Status,
    /// Today's completed duration.
    DailyTotal,
    /// Today's local screenshot count.
    ScreenshotCount,
}

/// Cadences of the three pollers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    /// Remote session status.
    pub status: Duration,
    /// Today's completed duration.
    pub daily_total: Duration,
    /// Local screenshot count.
    pub screenshot_count: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            status: DEFAULT_STATUS_INTERVAL,
            daily_total: DEFAULT_DAILY_TOTAL_INTERVAL,
            screenshot_count: DEFAULT_SCREENSHOT_COUNT_INTERVAL,
        }
    }
}

impl TryFrom<&PollingConfig> for PollIntervals {
    type Error = ConfigError;

    fn try_from(config: &PollingConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            status: config.status_interval()?,
            daily_total: config.daily_total_interval()?,
            screenshot_count: config.screenshot_count_interval()?,
        })
    }
}

/// Handles of running pollers.
#[derive(Debug)]
pub struct PollerSet {
    handles: Vec<JoinHandle<()>>,
}

impl PollerSet {
    /// Number of running pollers.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns `true` if no pollers were spawned.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits for every poller to exit.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "poller task panicked");
            }
        }
    }
}

impl SessionEngine {
    /// Performs one refresh of `kind`.
    pub async fn poll_once(&self, kind: PollKind) {
        match kind {
            PollKind::Status => {
                self.refresh_status().await;
            }
            PollKind::DailyTotal => self.refresh_daily_total().await,
            PollKind::ScreenshotCount => self.refresh_local_count().await,
        }
    }

    /// Spawns the three pollers. They stop on [`teardown`](Self::teardown).
    pub fn spawn_pollers(&self, intervals: PollIntervals) -> PollerSet {
        let handles = [
            (PollKind::Status, intervals.status),
            (PollKind::DailyTotal, intervals.daily_total),
            (PollKind::ScreenshotCount, intervals.screenshot_count),
        ]
        .into_iter()
        .map(|(kind, period)| {
            let engine = self.clone();
            let shutdown_rx = self.shutdown_receiver();
            tokio::spawn(async move { engine.run_poller(kind, period, shutdown_rx).await })
        })
        .collect();
        PollerSet { handles }
    }

    async fn run_poller(
        &self,
        kind: PollKind,
        period: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; mount already loaded fresh data.
        ticker.tick().await;
        debug!(?kind, ?period, "poller started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.is_mounted() {
                        break;
                    }
                    self.poll_once(kind).await;
                }
                _ = shutdown_rx.recv() => {
                    break;
                }
            }
        }
        info!(?kind, "poller stopped");
    }
}
