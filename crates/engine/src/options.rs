// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor configuration options.
//!
//! Options are constructed by the host process, validated once, and
//! immutable afterwards.

use std::time::Duration;
use thiserror::Error;

/// Rejected option value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionsError {
    #[error("{field} must be within {min}..={max}, got {value}")]
    OutOfRange { field: &'static str, min: u64, max: u64, value: u64 },

    #[error("scale value must be 0 or within 1..=10, got {0}")]
    InvalidScaleValue(u64),
}

/// Placement tuning for the installation supervisor (§4.3.1).
#[derive(Debug, Clone)]
pub struct SchedulingOptions {
    /// Sort candidates by how many installations they already host instead
    /// of by cluster age.
    pub balance_installations: bool,
    /// Per-dimension utilization ceilings, in percent.
    pub cluster_resource_threshold_cpu: u64,
    pub cluster_resource_threshold_memory: u64,
    pub cluster_resource_threshold_pod_count: u64,
    /// When non-zero, a candidate pushed over threshold is asked to grow by
    /// this many nodes (out of band) instead of being dropped.
    pub cluster_resource_threshold_scale_value: u64,
}

impl Default for SchedulingOptions {
    fn default() -> Self {
        Self {
            balance_installations: false,
            cluster_resource_threshold_cpu: 80,
            cluster_resource_threshold_memory: 80,
            cluster_resource_threshold_pod_count: 80,
            cluster_resource_threshold_scale_value: 0,
        }
    }
}

impl SchedulingOptions {
    gantry_core::setters! {
        set {
            balance_installations: bool,
            cluster_resource_threshold_cpu: u64,
            cluster_resource_threshold_memory: u64,
            cluster_resource_threshold_pod_count: u64,
            cluster_resource_threshold_scale_value: u64,
        }
    }

    /// Thresholds must fall in `[10, 100]`; the scale value is `0` or
    /// `[1, 10]`.
    pub fn validate(&self) -> Result<(), OptionsError> {
        let thresholds = [
            ("threshold_cpu", self.cluster_resource_threshold_cpu),
            ("threshold_memory", self.cluster_resource_threshold_memory),
            ("threshold_pod_count", self.cluster_resource_threshold_pod_count),
        ];
        for (field, value) in thresholds {
            if !(10..=100).contains(&value) {
                return Err(OptionsError::OutOfRange { field, min: 10, max: 100, value });
            }
        }
        let scale = self.cluster_resource_threshold_scale_value;
        if scale != 0 && !(1..=10).contains(&scale) {
            return Err(OptionsError::InvalidScaleValue(scale));
        }
        Ok(())
    }
}

/// Behavior toggles for the installation supervisor.
#[derive(Debug, Clone, Default)]
pub struct InstallationSupervisorOptions {
    /// Leave the installation's database contents in place on deletion.
    pub keep_database_data: bool,
    /// Leave the installation's filestore contents in place on deletion.
    pub keep_filestore_data: bool,
    /// Migrate live custom resources to the installation's CR version during
    /// updates.
    pub force_cr_upgrade: bool,
}

impl InstallationSupervisorOptions {
    gantry_core::setters! {
        set {
            keep_database_data: bool,
            keep_filestore_data: bool,
            force_cr_upgrade: bool,
        }
    }
}

/// Tuning for the installation-deletion supervisor (§4.8).
#[derive(Debug, Clone)]
pub struct DeletionSupervisorOptions {
    /// Grace period an installation sits in `deletion-pending` when no
    /// explicit expiry is set, measured against the event trail.
    pub deletion_pending_time: Duration,
    /// Soft fleet-wide cap: the supervisor stands down while this many
    /// installations are already updating.
    pub currently_updating_limit: u64,
}

impl Default for DeletionSupervisorOptions {
    fn default() -> Self {
        Self {
            deletion_pending_time: Duration::from_secs(60 * 60),
            currently_updating_limit: 25,
        }
    }
}

impl DeletionSupervisorOptions {
    gantry_core::setters! {
        set {
            deletion_pending_time: Duration,
            currently_updating_limit: u64,
        }
    }

    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.currently_updating_limit == 0 {
            return Err(OptionsError::OutOfRange {
                field: "currently_updating_limit",
                min: 1,
                max: u64::MAX,
                value: 0,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod tests;
