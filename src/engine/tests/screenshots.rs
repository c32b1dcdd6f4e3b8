//! Screenshot baseline and reconciliation tests.

use chrono::Duration;

use super::{harness, mounted};
use crate::backend::memory::Operation;
use crate::engine::poller::PollKind;
use crate::services::ServiceError;
use crate::RemoteConfig;

#[tokio::test]
async fn test_session_captures_add_to_server_count() {
    let h = harness();
    h.backend.set_server_screenshot_count(7);
    h.engine.mount().await.expect("mount");
    assert_eq!(h.engine.snapshot().await.screenshots_today, 7);

    h.engine.start(None, None).await.expect("start");
    for _ in 0..3 {
        h.backend.capture_screenshot();
    }
    h.engine.refresh_local_count().await;
    let snap = h.engine.snapshot().await;
    assert_eq!(snap.screenshots_today, 10);
    assert_eq!(snap.counters.session_delta(), 3);
}

#[tokio::test]
async fn test_local_store_reset_clamps_to_server_count() {
    let h = harness();
    h.backend.set_server_screenshot_count(7);
    h.backend.capture_screenshot();
    h.backend.capture_screenshot();
    h.engine.mount().await.expect("mount");
    h.engine.start(None, None).await.expect("start");
    assert_eq!(h.engine.snapshot().await.counters.local_baseline_at_start, 2);

    h.backend.clear_local_screenshots();
    h.engine.refresh_local_count().await;
    let snap = h.engine.snapshot().await;
    assert_eq!(snap.counters.local_count_now, 0);
    assert_eq!(snap.screenshots_today, 7);
}

#[tokio::test]
async fn test_start_refixes_server_count() {
    let h = harness();
    h.backend.set_server_screenshot_count(4);
    h.engine.mount().await.expect("mount");

    h.backend.set_server_screenshot_count(6);
    h.engine.start(None, None).await.expect("start");
    assert_eq!(h.engine.snapshot().await.counters.server_count_at_start, 6);

    h.backend.set_server_screenshot_count(9);
    h.engine.refresh_server_count().await;
    assert_eq!(
        h.engine.snapshot().await.counters.server_count_at_start,
        6,
        "server count stays fixed while a session is live"
    );
}

#[tokio::test]
async fn test_idle_refresh_updates_server_count() {
    let h = mounted().await;
    h.backend.set_server_screenshot_count(5);
    h.engine.refresh_server_count().await;
    assert_eq!(h.engine.snapshot().await.screenshots_today, 5);
}

#[tokio::test]
async fn test_server_count_failure_falls_back_to_zero_silently() {
    let h = harness();
    h.backend.set_server_screenshot_count(7);
    h.engine.mount().await.expect("mount");

    h.backend
        .fail_next(Operation::ScreenshotCount, ServiceError::Unauthenticated);
    h.engine.start(None, None).await.expect("start should still succeed");

    let snap = h.engine.snapshot().await;
    assert_eq!(snap.counters.server_count_at_start, 0);
    assert!(snap.last_error.is_none());
}

#[tokio::test]
async fn test_local_store_failure_keeps_last_sample() {
    let h = mounted().await;
    h.backend.capture_screenshot();
    h.engine.refresh_local_count().await;
    assert_eq!(h.engine.snapshot().await.counters.local_count_now, 1);

    h.backend.capture_screenshot();
    h.backend.fail_next(
        Operation::LocalScreenshots,
        ServiceError::Local("permission denied".to_string()),
    );
    h.engine.refresh_local_count().await;
    assert_eq!(h.engine.snapshot().await.counters.local_count_now, 1);
}

#[tokio::test]
async fn test_only_todays_local_captures_count() {
    let h = harness();
    h.backend.capture_screenshot();
    h.clock.advance(Duration::days(1));
    h.backend.capture_screenshot();
    h.engine.mount().await.expect("mount");
    h.engine.refresh_local_count().await;
    assert_eq!(h.engine.snapshot().await.counters.local_count_now, 1);
}

#[tokio::test]
async fn test_failed_start_restores_baselines() {
    let h = harness();
    h.backend.set_server_screenshot_count(3);
    h.engine.mount().await.expect("mount");
    let before = h.engine.snapshot().await.counters;

    h.backend.set_server_screenshot_count(8);
    h.backend.capture_screenshot();
    h.backend
        .fail_next(Operation::Start, ServiceError::Remote("nope".to_string()));
    h.engine.start(None, None).await.expect_err("should fail");

    assert_eq!(h.engine.snapshot().await.counters, before);
}

#[tokio::test]
async fn test_stop_zeroes_baseline_and_refetches_server_count() {
    let h = harness();
    h.backend.set_server_screenshot_count(7);
    h.engine.mount().await.expect("mount");
    h.engine.start(None, None).await.expect("start");
    h.backend.capture_screenshot();
    h.engine.refresh_local_count().await;

    h.backend.set_server_screenshot_count(9);
    h.engine.begin_stop().await.expect("begin stop");
    h.engine.confirm_stop("Done").await.expect("confirm");

    let counters = h.engine.snapshot().await.counters;
    assert_eq!(counters.server_count_at_start, 9);
    assert_eq!(counters.local_baseline_at_start, 0);
}

#[tokio::test]
async fn test_idle_total_after_stop_keeps_server_count() {
    let h = harness();
    h.backend.set_server_screenshot_count(7);
    h.engine.mount().await.expect("mount");
    h.engine.start(None, None).await.expect("start");
    for _ in 0..3 {
        h.backend.capture_screenshot();
    }
    h.engine.refresh_local_count().await;
    assert_eq!(h.engine.snapshot().await.screenshots_today, 10);

    h.engine.begin_stop().await.expect("begin stop");
    h.engine.confirm_stop("Done").await.expect("confirm");
    for kind in [PollKind::Status, PollKind::DailyTotal, PollKind::ScreenshotCount] {
        h.engine.poll_once(kind).await;
    }

    let idle = h.engine.snapshot().await.screenshots_today;
    assert!(idle >= 7, "idle total {idle} fell below the server count");
}

#[tokio::test]
async fn test_estimate_follows_remote_interval() {
    let h = harness();
    h.backend.set_remote_config(RemoteConfig {
        screenshot_interval_ms: 60_000,
    });
    h.engine.mount().await.expect("mount");
    assert_eq!(h.engine.snapshot().await.estimated_screenshots, None);

    h.engine.start(None, None).await.expect("start");
    h.clock.advance(Duration::seconds(330));
    h.engine.refresh_status().await;
    assert_eq!(h.engine.snapshot().await.estimated_screenshots, Some(5));
}
