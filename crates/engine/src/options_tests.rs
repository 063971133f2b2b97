// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn defaults_validate() {
    assert_eq!(SchedulingOptions::default().validate(), Ok(()));
    assert_eq!(DeletionSupervisorOptions::default().validate(), Ok(()));
}

#[parameterized(
    lower_bound = { 10, true },
    upper_bound = { 100, true },
    below = { 9, false },
    above = { 101, false },
    zero = { 0, false },
)]
fn thresholds_must_fall_in_range(value: u64, ok: bool) {
    let options = SchedulingOptions::default().cluster_resource_threshold_cpu(value);
    assert_eq!(options.validate().is_ok(), ok);
}

#[parameterized(
    disabled = { 0, true },
    one = { 1, true },
    ten = { 10, true },
    eleven = { 11, false },
)]
fn scale_value_is_zero_or_one_to_ten(value: u64, ok: bool) {
    let options = SchedulingOptions::default().cluster_resource_threshold_scale_value(value);
    assert_eq!(options.validate().is_ok(), ok);
}

#[test]
fn each_threshold_dimension_is_validated() {
    for options in [
        SchedulingOptions::default().cluster_resource_threshold_memory(5),
        SchedulingOptions::default().cluster_resource_threshold_pod_count(200),
    ] {
        assert!(options.validate().is_err());
    }
}

#[test]
fn updating_limit_must_be_positive() {
    let options = DeletionSupervisorOptions::default().currently_updating_limit(0);
    assert!(options.validate().is_err());
}
