// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory-lock helper shared by the supervisors.
//!
//! Locks are advisory rows in the store; the store enforces per-row mutual
//! exclusion. A failed lock attempt is never an error at this level: the
//! cycle just skips the row and lets a later cycle (or another process)
//! pick it up.

use gantry_store::StoreError;
use std::future::Future;
use tracing::{debug, error, warn};

/// Try to take an advisory lock. Store errors count as "not acquired".
pub(crate) async fn acquire<F>(attempt: F, kind: &str, id: &str) -> bool
where
    F: Future<Output = Result<bool, StoreError>>,
{
    match attempt.await {
        Ok(true) => true,
        Ok(false) => {
            debug!(kind, id, "lock held elsewhere, skipping");
            false
        }
        Err(error) => {
            warn!(kind, id, %error, "lock attempt failed");
            false
        }
    }
}

/// Release an advisory lock taken with [`acquire`].
///
/// The store reporting "not held" here means another actor force-released or
/// stole the row mid-cycle; that is loud-log worthy but never fatal.
pub(crate) async fn release<F>(attempt: F, kind: &str, id: &str)
where
    F: Future<Output = Result<bool, StoreError>>,
{
    match attempt.await {
        Ok(true) => {}
        Ok(false) => error!(kind, id, "lock was not held at release"),
        Err(error) => error!(kind, id, %error, "lock release failed"),
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
