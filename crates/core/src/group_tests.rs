// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn max_rolling_zero_pauses_the_group() {
    let group = Group::builder().max_rolling(0).build();
    assert!(group.is_paused());
    let group = Group::builder().max_rolling(2).build();
    assert!(!group.is_paused());
}

#[test]
fn soft_deletion_flag() {
    let mut group = Group::builder().build();
    assert!(!group.is_deleted());
    group.delete_at = 1;
    assert!(group.is_deleted());
}
