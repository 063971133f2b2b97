// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Composable unit of periodic work.

use crate::error::EngineError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Something a [`crate::Scheduler`] can invoke periodically.
#[async_trait]
pub trait Doer: Send + Sync + 'static {
    /// One reconciliation pass. Expected to return quickly relative to the
    /// scheduling period; long-running work belongs in the resources' state
    /// machines, not in a single pass.
    async fn run(&self) -> Result<(), EngineError>;

    /// Release resources before the process exits.
    async fn shutdown(&self) {}

    /// Name used in scheduler and composition logs.
    fn name(&self) -> &'static str {
        "doer"
    }
}

/// Runs a set of doers in order and reports whether any of them failed.
///
/// A failing child never prevents the remaining children from running.
pub struct MultiDoer {
    doers: Vec<Arc<dyn Doer>>,
}

impl MultiDoer {
    pub fn new(doers: Vec<Arc<dyn Doer>>) -> Self {
        Self { doers }
    }
}

#[async_trait]
impl Doer for MultiDoer {
    async fn run(&self) -> Result<(), EngineError> {
        let mut failed = 0;
        for doer in &self.doers {
            if let Err(error) = doer.run().await {
                failed += 1;
                warn!(doer = doer.name(), %error, "doer failed");
            }
        }
        if failed > 0 {
            return Err(EngineError::MultiDoer { failed, total: self.doers.len() });
        }
        Ok(())
    }

    async fn shutdown(&self) {
        for doer in &self.doers {
            doer.shutdown().await;
        }
    }

    fn name(&self) -> &'static str {
        "multi-doer"
    }
}

#[cfg(test)]
#[path = "doer_tests.rs"]
mod tests;
