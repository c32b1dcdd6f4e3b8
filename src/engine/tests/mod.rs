//! Tests for the SessionEngine.
//!
//! - `lifecycle`: start/pause/resume guards, time accounting, error surfacing
//! - `stop_flow`: the save/cancel protocol
//! - `screenshots`: baseline fixing and count reconciliation
//! - `poller`: periodic refresh and shutdown
//! - `teardown`: writes after teardown are discarded

mod screenshots;

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone};

use super::{Collaborators, SessionEngine};
use crate::backend::MemoryBackend;
use crate::clock::ManualClock;

/// Engine wired to an in-memory backend and a manual clock.
pub(super) struct Harness {
    pub engine: SessionEngine,
    pub backend: MemoryBackend,
    pub clock: ManualClock,
}

/// 2024-03-02 at `h:m` local time.
pub(super) fn at(h: u32, m: u32) -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2024, 3, 2, h, m, 0)
        .single()
        .expect("unambiguous local time")
}

/// Builds an engine whose clock reads 09:00. Nothing is loaded yet.
pub(super) fn harness() -> Harness {
    let clock = ManualClock::new(at(9, 0));
    let backend = MemoryBackend::new(Arc::new(clock.clone()));
    let engine = SessionEngine::new(Collaborators::from_memory(
        backend.clone(),
        Arc::new(clock.clone()),
    ));
    Harness {
        engine,
        backend,
        clock,
    }
}

/// Builds and mounts an engine.
pub(super) async fn mounted() -> Harness {
    let h = harness();
    h.engine.mount().await.expect("mount should succeed");
    h
}
