// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::EngineError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::sleep;

struct SlowDoer {
    runs: AtomicUsize,
    shutdowns: AtomicUsize,
    delay: Duration,
    fail: bool,
}

impl SlowDoer {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            runs: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
            delay,
            fail: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            runs: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
            delay: Duration::ZERO,
            fail: true,
        })
    }

    fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Doer for SlowDoer {
    async fn run(&self) -> Result<(), EngineError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        if self.fail {
            return Err(EngineError::MultiDoer { failed: 1, total: 1 });
        }
        Ok(())
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &'static str {
        "slow-doer"
    }
}

#[tokio::test]
async fn zero_period_disables_periodic_and_manual_runs() {
    let doer = SlowDoer::new(Duration::ZERO);
    let scheduler = Scheduler::new(doer.clone(), Duration::ZERO);

    scheduler.run_now();
    sleep(Duration::from_millis(50)).await;
    assert_eq!(doer.runs(), 0);
    scheduler.close().await;
}

#[tokio::test]
async fn periodic_runs_fire_at_the_configured_cadence() {
    let doer = SlowDoer::new(Duration::ZERO);
    let scheduler = Scheduler::new(doer.clone(), Duration::from_millis(20));

    sleep(Duration::from_millis(110)).await;
    scheduler.close().await;
    let runs = doer.runs();
    assert!(runs >= 2, "expected at least 2 periodic runs, got {runs}");

    // The timer is stopped after close.
    sleep(Duration::from_millis(60)).await;
    assert_eq!(doer.runs(), runs);
}

#[tokio::test]
async fn manual_trigger_runs_before_the_first_tick() {
    let doer = SlowDoer::new(Duration::ZERO);
    let scheduler = Scheduler::new(doer.clone(), Duration::from_secs(3600));

    scheduler.run_now();
    sleep(Duration::from_millis(50)).await;
    assert_eq!(doer.runs(), 1);
    scheduler.close().await;
}

#[tokio::test]
async fn concurrent_triggers_coalesce_into_one_follow_up_run() {
    let doer = SlowDoer::new(Duration::from_millis(80));
    let scheduler = Scheduler::new(doer.clone(), Duration::from_secs(3600));

    scheduler.run_now();
    sleep(Duration::from_millis(20)).await; // first run is now in flight
    scheduler.run_now();
    scheduler.run_now();
    scheduler.run_now();

    sleep(Duration::from_millis(300)).await;
    assert_eq!(doer.runs(), 2, "requests during a run must coalesce into one");
    scheduler.close().await;
}

#[tokio::test]
async fn failing_doer_does_not_stop_the_timer() {
    let doer = SlowDoer::failing();
    let scheduler = Scheduler::new(doer.clone(), Duration::from_millis(20));

    sleep(Duration::from_millis(110)).await;
    assert!(doer.runs() >= 2, "timer must keep firing after failures");
    scheduler.close().await;
}

#[tokio::test]
async fn close_waits_for_the_in_flight_run_and_shuts_the_doer_down() {
    let doer = SlowDoer::new(Duration::from_millis(80));
    let scheduler = Scheduler::new(doer.clone(), Duration::from_secs(3600));

    scheduler.run_now();
    sleep(Duration::from_millis(20)).await;
    scheduler.close().await;

    // close returned, so the run must have completed and shutdown run once.
    assert_eq!(doer.runs(), 1);
    assert_eq!(doer.shutdowns.load(Ordering::SeqCst), 1);

    // Idempotent; no second shutdown.
    scheduler.close().await;
    assert_eq!(doer.shutdowns.load(Ordering::SeqCst), 1);

    // Triggers after close schedule nothing.
    scheduler.run_now();
    sleep(Duration::from_millis(50)).await;
    assert_eq!(doer.runs(), 1);
}
