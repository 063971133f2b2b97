// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

struct CountingDoer {
    runs: AtomicUsize,
    shutdowns: AtomicUsize,
    fail: bool,
}

impl CountingDoer {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self { runs: AtomicUsize::new(0), shutdowns: AtomicUsize::new(0), fail })
    }
}

#[async_trait]
impl Doer for CountingDoer {
    async fn run(&self) -> Result<(), EngineError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(EngineError::MultiDoer { failed: 1, total: 1 });
        }
        Ok(())
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &'static str {
        "counting-doer"
    }
}

#[tokio::test]
async fn multi_doer_runs_every_child_despite_failures() {
    let failing = CountingDoer::new(true);
    let healthy = CountingDoer::new(false);
    let doers: Vec<Arc<dyn Doer>> = vec![failing.clone(), healthy.clone()];
    let multi = MultiDoer::new(doers);

    let result = multi.run().await;

    assert_eq!(failing.runs.load(Ordering::SeqCst), 1);
    assert_eq!(healthy.runs.load(Ordering::SeqCst), 1);
    match result {
        Err(EngineError::MultiDoer { failed, total }) => {
            assert_eq!(failed, 1);
            assert_eq!(total, 2);
        }
        other => panic!("expected MultiDoer error, got {other:?}"),
    }
}

#[tokio::test]
async fn multi_doer_succeeds_when_all_children_do() {
    let a = CountingDoer::new(false);
    let b = CountingDoer::new(false);
    let doers: Vec<Arc<dyn Doer>> = vec![a.clone(), b.clone()];
    let multi = MultiDoer::new(doers);
    assert!(multi.run().await.is_ok());
}

#[tokio::test]
async fn multi_doer_shutdown_reaches_every_child() {
    let a = CountingDoer::new(false);
    let b = CountingDoer::new(true);
    let doers: Vec<Arc<dyn Doer>> = vec![a.clone(), b.clone()];
    let multi = MultiDoer::new(doers);
    multi.shutdown().await;
    assert_eq!(a.shutdowns.load(Ordering::SeqCst), 1);
    assert_eq!(b.shutdowns.load(Ordering::SeqCst), 1);
}
