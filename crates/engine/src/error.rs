// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error type.

use gantry_store::StoreError;
use thiserror::Error;

/// Failure of one engine cycle.
///
/// Only scan-level failures surface here; per-resource failures are absorbed
/// into state decisions inside `supervise` and logged.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{failed} of {total} doers failed")]
    MultiDoer { failed: usize, total: usize },
}
