//! Screenshot count reconciliation.
//!
//! Two independently refreshed sources feed one display number: the remote
//! "today" count, fixed when a session starts, and the local capture count,
//! re-sampled on its own cadence. Only captures made after the session's
//! baseline are added on top of the remote count.
//!
//! Fetch failures here are advisory. They are logged and replaced with a
//! safe default, never surfaced as operational errors.

use chrono::{Local, NaiveDate};
use tracing::{debug, warn};

use crate::services::{LocalScreenshotStore, ScreenshotCountService};
use crate::{ScreenshotRecord, SessionStatus};

/// Session-scoped screenshot counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenshotCounters {
    /// Remote "today" count, fixed at session start (and on idle refresh).
    pub server_count_at_start: u64,
    /// Local capture count sampled at session start.
    pub local_baseline_at_start: u64,
    /// Latest local capture count sample.
    pub local_count_now: u64,
}

impl ScreenshotCounters {
    /// Remote count plus captures made since the baseline.
    ///
    /// A local count below the baseline (store cleared, day rolled over)
    /// contributes nothing rather than a negative delta.
    pub fn display_total(&self) -> u64 {
        self.server_count_at_start
            + self
                .local_count_now
                .saturating_sub(self.local_baseline_at_start)
    }

    /// Captures made since the baseline.
    pub fn session_delta(&self) -> u64 {
        self.local_count_now
            .saturating_sub(self.local_baseline_at_start)
    }

    /// Fixes both baselines at session start.
    pub fn fix_baseline(&mut self, server_count: u64, local_count: u64) {
        self.server_count_at_start = server_count;
        self.local_baseline_at_start = local_count;
        self.local_count_now = local_count;
    }

    /// Records a new local sample. The baseline is left untouched.
    pub fn observe_local(&mut self, local_count: u64) {
        self.local_count_now = local_count;
    }

    /// Zeroes the session baselines after a successful stop.
    ///
    /// The last local sample is kept so the next poll starts from it.
    pub fn reset(&mut self) {
        self.server_count_at_start = 0;
        self.local_baseline_at_start = 0;
    }
}

/// Counts records captured on `day` in the device's local timezone.
pub fn count_captured_on(records: &[ScreenshotRecord], day: NaiveDate) -> u64 {
    records
        .iter()
        .filter(|r| r.captured_at.with_timezone(&Local).date_naive() == day)
        .count() as u64
}

/// Estimated capture count for display next to the real one.
///
/// `None` when no session is live or the interval is unknown.
pub fn estimate_from_interval(status: &SessionStatus, screenshot_interval_ms: u64) -> Option<u64> {
    if !status.is_live() || screenshot_interval_ms == 0 {
        return None;
    }
    Some(status.elapsed_ms / screenshot_interval_ms)
}

/// Fetches the remote "today" count, falling back to 0 on failure.
pub async fn fetch_server_count(service: &dyn ScreenshotCountService) -> u64 {
    match service.today_count().await {
        Ok(count) => {
            debug!(count, "remote screenshot count refreshed");
            count
        }
        Err(e) => {
            warn!(error = %e, "remote screenshot count unavailable, using 0");
            0
        }
    }
}

/// Counts today's local captures, or `None` when the store cannot be read.
pub async fn fetch_local_count(store: &dyn LocalScreenshotStore, today: NaiveDate) -> Option<u64> {
    match store.all().await {
        Ok(records) => Some(count_captured_on(&records, today)),
        Err(e) => {
            warn!(error = %e, "local screenshot store unavailable, keeping last count");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionState;
    use chrono::{Duration, TimeZone, Utc};

    fn counters(server: u64, baseline: u64) -> ScreenshotCounters {
        let mut c = ScreenshotCounters::default();
        c.fix_baseline(server, baseline);
        c
    }

    #[test]
    fn display_total_adds_session_captures_to_server_count() {
        let mut c = counters(7, 0);
        c.observe_local(3);
        assert_eq!(c.display_total(), 10);
    }

    #[test]
    fn local_reset_clamps_to_server_count() {
        let mut c = counters(7, 0);
        c.observe_local(3);
        assert_eq!(c.display_total(), 10);

        let mut c = counters(7, 3);
        c.observe_local(0);
        assert_eq!(c.display_total(), 7);
        assert_eq!(c.session_delta(), 0);
    }

    #[test]
    fn display_total_non_decreasing_for_samples_above_baseline() {
        let mut c = counters(4, 12);
        let mut previous = c.display_total();
        for sample in [12, 12, 13, 15, 15, 20] {
            c.observe_local(sample);
            assert!(c.display_total() >= previous);
            previous = c.display_total();
        }
        assert_eq!(previous, 12);
    }

    #[test]
    fn reset_zeroes_baselines() {
        let mut c = counters(7, 3);
        c.observe_local(5);
        c.reset();
        assert_eq!(c.server_count_at_start, 0);
        assert_eq!(c.local_baseline_at_start, 0);
        assert_eq!(c.local_count_now, 5);
    }

    #[test]
    fn count_captured_on_filters_by_local_day() {
        let day = Local
            .with_ymd_and_hms(2024, 3, 2, 12, 0, 0)
            .single()
            .expect("unambiguous local time");
        let records = [
            ScreenshotRecord {
                captured_at: day.with_timezone(&Utc),
            },
            ScreenshotRecord {
                captured_at: (day + Duration::hours(1)).with_timezone(&Utc),
            },
            ScreenshotRecord {
                captured_at: (day - Duration::days(1)).with_timezone(&Utc),
            },
        ];
        assert_eq!(count_captured_on(&records, day.date_naive()), 2);
    }

    #[test]
    fn estimate_only_when_live() {
        let mut status = SessionStatus {
            is_tracking: true,
            state: SessionState::Running,
            elapsed_ms: 25 * 60_000,
            ..SessionStatus::default()
        };
        assert_eq!(estimate_from_interval(&status, 10 * 60_000), Some(2));
        assert_eq!(estimate_from_interval(&status, 0), None);

        status.state = SessionState::Stopped;
        status.is_tracking = false;
        assert_eq!(estimate_from_interval(&status, 10 * 60_000), None);
    }
}
