// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store error type.

use thiserror::Error;

/// Failure reported by a store operation.
///
/// Supervisors treat every store error as transient (§7): log, keep the
/// current state, retry next cycle. `NotFound` is still an error — queries
/// that can legitimately miss return `Option` instead.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("store backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound { entity, id: id.into() }
    }
}
