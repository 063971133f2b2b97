// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn acquire_passes_through_the_store_answer() {
    assert!(acquire(async { Ok(true) }, "installation", "ins-a").await);
    assert!(!acquire(async { Ok(false) }, "installation", "ins-a").await);
}

#[tokio::test]
async fn acquire_treats_store_errors_as_not_acquired() {
    let attempt = async { Err(StoreError::Backend("connection reset".to_string())) };
    assert!(!acquire(attempt, "installation", "ins-a").await);
}

#[tokio::test]
async fn release_swallows_not_held_and_errors() {
    // Neither outcome may panic or propagate; they only log.
    release(async { Ok(true) }, "group", "grp-a").await;
    release(async { Ok(false) }, "group", "grp-a").await;
    release(async { Err(StoreError::Backend("gone".to_string())) }, "group", "grp-a").await;
}
