// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gantry-adapters: the external collaborators the engine consumes.
//!
//! The reconciliation engine drives workload clusters, backup/restore jobs,
//! database movement, cloud resources, and the notification pipeline purely
//! through the traits defined here. Production implementations live outside
//! this workspace; the fakes (behind `test-support`) are scriptable per
//! method so tests can exercise transient and terminal failure paths.

pub mod cloud;
pub mod events;
pub mod operators;
pub mod provisioner;

#[cfg(any(test, feature = "test-support"))]
pub mod fakes;

pub use cloud::{CloudClient, CloudError};
pub use events::{EventError, EventProducer};
pub use operators::{BackupOperator, DbMigrationOperator, OperatorError, RestoreOperator};
pub use provisioner::{
    ClusterResources, Provisioner, ProvisionerError, ProvisionerRegistry, ResourceState,
};

#[cfg(any(test, feature = "test-support"))]
pub use fakes::{
    FakeBackupOperator, FakeCloudClient, FakeDbMigrationOperator, FakeProvisioner,
    FakeRestoreOperator, RecordingEventProducer,
};
