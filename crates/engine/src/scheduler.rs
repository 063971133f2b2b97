// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic driver for a single doer.
//!
//! One cooperative worker task per scheduler. At most one run of the wrapped
//! doer is ever in flight; manual trigger requests arriving while a run is
//! in flight coalesce into at most one follow-up run. A zero period disables
//! the scheduler entirely, manual triggers included.

use crate::doer::Doer;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Drives a [`Doer`] at a fixed cadence plus on demand.
pub struct Scheduler {
    doer: Arc<dyn Doer>,
    trigger: Arc<Notify>,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
    disabled: bool,
}

impl Scheduler {
    /// Start a scheduler firing every `period`. A zero period disables
    /// periodic and manual runs.
    pub fn new(doer: Arc<dyn Doer>, period: Duration) -> Self {
        let trigger = Arc::new(Notify::new());
        let cancel = CancellationToken::new();

        if period.is_zero() {
            debug!(doer = doer.name(), "scheduler disabled");
            return Self {
                doer,
                trigger,
                cancel,
                worker: Mutex::new(None),
                closed: AtomicBool::new(false),
                disabled: true,
            };
        }

        let worker = tokio::spawn(worker_loop(
            doer.clone(),
            period,
            trigger.clone(),
            cancel.clone(),
        ));
        Self {
            doer,
            trigger,
            cancel,
            worker: Mutex::new(Some(worker)),
            closed: AtomicBool::new(false),
            disabled: false,
        }
    }

    /// Request an immediate run. Returns without waiting; if a run is in
    /// flight, at most one follow-up run is started when it ends. No-op when
    /// the scheduler is disabled or closed.
    pub fn run_now(&self) {
        if self.disabled || self.closed.load(Ordering::SeqCst) {
            return;
        }
        self.trigger.notify_one();
    }

    /// Stop periodic runs, wait for any in-flight run to finish, then shut
    /// the doer down. Subsequent calls return immediately.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel.cancel();
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            worker.await.ok();
        }
        self.doer.shutdown().await;
    }
}

async fn worker_loop(
    doer: Arc<dyn Doer>,
    period: Duration,
    trigger: Arc<Notify>,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = trigger.notified() => {}
            _ = ticker.tick() => {}
        }
        // Trigger permits posted while run() is in flight are held by the
        // Notify and coalesce into exactly one extra iteration.
        if let Err(error) = doer.run().await {
            warn!(doer = doer.name(), %error, "scheduled run failed");
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
