// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gantry-core: entity model for the gantry control plane.
//!
//! Clusters, installations, their per-cluster realizations, groups, backup
//! and database-operation records, and the state-change audit trail. Every
//! entity carries the shared lifecycle columns (create/delete timestamps and
//! the advisory-lock pair) and a closed state enumeration with a stable wire
//! string per state.

pub mod macros;

pub mod backup;
pub mod clock;
pub mod cluster;
pub mod cluster_installation;
pub mod event;
pub mod group;
pub mod id;
pub mod installation;
pub mod migration;
pub mod restoration;

pub use backup::{DataResidence, InstallationBackup, InstallationBackupId, InstallationBackupState};
pub use clock::{Clock, FakeClock, SystemClock};
pub use cluster::{Cluster, ClusterId, ClusterState};
pub use cluster_installation::{ClusterInstallation, ClusterInstallationId, ClusterInstallationState};
pub use event::{ResourceType, StateChangeEvent, StateChangeEventId};
pub use group::{Group, GroupId};
pub use installation::{
    Affinity, DatabaseKind, FilestoreKind, Installation, InstallationId, InstallationState,
    InstallationsStatus, ResourceRequest, Size,
};
pub use migration::{InstallationDbMigrationOperation, InstallationDbMigrationOperationId, MigrationState};
pub use restoration::{
    InstallationDbRestorationOperation, InstallationDbRestorationOperationId, RestorationState,
};
