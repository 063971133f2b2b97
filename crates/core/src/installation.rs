// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Installation entity and lifecycle state machine.
//!
//! An installation is one tenant instance of the managed application. Its
//! state walks the creation pipeline (placement → child provisioning → DNS →
//! final tasks → stable), the update/hibernation/wake-up loops, the
//! deletion-pending grace period, and finally deletion. The database
//! operation supervisors additionally park installations in the
//! `db-restoration-*` / `db-migration-*` holding states while they run.

use crate::group::Group;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

crate::define_id! {
    /// Unique identifier for a tenant installation.
    pub struct InstallationId("ins-");
}

/// Projected compute request one installation adds to a cluster.
///
/// Units follow the cluster resource report: milli-CPU, milli-memory, and a
/// flat pod count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub milli_cpu: u64,
    pub milli_memory: u64,
    pub pods: u64,
}

/// Closed set of installation sizes.
///
/// The size determines the projected [`ResourceRequest`] used by placement;
/// the actual workload resources are the provisioner's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Size {
    Small,
    Medium,
    Large,
}

crate::state_strings! {
    Size {
        Small => "small",
        Medium => "medium",
        Large => "large",
    }
}

impl Size {
    /// The compute request projected onto a candidate cluster.
    pub fn resource_request(&self) -> ResourceRequest {
        match self {
            Size::Small => ResourceRequest { milli_cpu: 500, milli_memory: 1_000_000, pods: 10 },
            Size::Medium => ResourceRequest { milli_cpu: 1_000, milli_memory: 2_000_000, pods: 20 },
            Size::Large => ResourceRequest { milli_cpu: 2_000, milli_memory: 4_000_000, pods: 40 },
        }
    }
}

/// Cluster-sharing affinity of an installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Affinity {
    /// The installation shares a cluster with others.
    MultiTenant,
    /// The installation occupies its cluster alone.
    Isolated,
}

crate::state_strings! {
    Affinity {
        MultiTenant => "multi-tenant",
        Isolated => "isolated",
    }
}

/// Kind of database backing an installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseKind {
    /// Operator-managed database inside the workload cluster.
    ClusterLocal,
    /// Dedicated external database instance.
    SingleTenant,
    /// Shared external database server with one logical database per tenant.
    MultiTenant,
}

crate::state_strings! {
    DatabaseKind {
        ClusterLocal => "cluster-local",
        SingleTenant => "single-tenant",
        MultiTenant => "multi-tenant",
    }
}

/// Kind of file storage backing an installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilestoreKind {
    /// Operator-managed storage inside the workload cluster.
    ClusterLocal,
    /// Dedicated object-store bucket.
    ObjectStore,
    /// Shared bucket with one prefix per tenant.
    SharedObjectStore,
}

crate::state_strings! {
    FilestoreKind {
        ClusterLocal => "cluster-local",
        ObjectStore => "object-store",
        SharedObjectStore => "shared-object-store",
    }
}

/// Lifecycle state of an installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallationState {
    CreationRequested,
    CreationNoCompatibleClusters,
    CreationPreProvisioning,
    CreationInProgress,
    CreationDns,
    CreationFinalTasks,
    CreationFailed,
    Stable,
    UpdateRequested,
    UpdateInProgress,
    HibernationRequested,
    HibernationInProgress,
    Hibernating,
    WakeUpRequested,
    DeletionPendingRequested,
    DeletionPendingInProgress,
    DeletionPending,
    DeletionCancellationRequested,
    DeletionRequested,
    DeletionInProgress,
    DeletionFinalCleanup,
    DeletionFailed,
    Deleted,
    /// Parked by the restoration supervisor while a restore runs.
    DbRestorationInProgress,
    DbRestorationFailed,
    /// Parked by the migration supervisor while a migration runs.
    DbMigrationInProgress,
    DbMigrationFailed,
}

crate::state_strings! {
    InstallationState {
        CreationRequested => "creation-requested",
        CreationNoCompatibleClusters => "creation-no-compatible-clusters",
        CreationPreProvisioning => "creation-pre-provisioning",
        CreationInProgress => "creation-in-progress",
        CreationDns => "creation-dns",
        CreationFinalTasks => "creation-final-tasks",
        CreationFailed => "creation-failed",
        Stable => "stable",
        UpdateRequested => "update-requested",
        UpdateInProgress => "update-in-progress",
        HibernationRequested => "hibernation-requested",
        HibernationInProgress => "hibernation-in-progress",
        Hibernating => "hibernating",
        WakeUpRequested => "wake-up-requested",
        DeletionPendingRequested => "deletion-pending-requested",
        DeletionPendingInProgress => "deletion-pending-in-progress",
        DeletionPending => "deletion-pending",
        DeletionCancellationRequested => "deletion-cancellation-requested",
        DeletionRequested => "deletion-requested",
        DeletionInProgress => "deletion-in-progress",
        DeletionFinalCleanup => "deletion-final-cleanup",
        DeletionFailed => "deletion-failed",
        Deleted => "deleted",
        DbRestorationInProgress => "db-restoration-in-progress",
        DbRestorationFailed => "db-restoration-failed",
        DbMigrationInProgress => "db-migration-in-progress",
        DbMigrationFailed => "db-migration-failed",
    }
}

impl InstallationState {
    /// States the installation supervisor scans for.
    pub fn pending_work(&self) -> bool {
        matches!(
            self,
            InstallationState::CreationRequested
                | InstallationState::CreationNoCompatibleClusters
                | InstallationState::CreationPreProvisioning
                | InstallationState::CreationInProgress
                | InstallationState::CreationDns
                | InstallationState::CreationFinalTasks
                | InstallationState::UpdateRequested
                | InstallationState::UpdateInProgress
                | InstallationState::HibernationRequested
                | InstallationState::HibernationInProgress
                | InstallationState::WakeUpRequested
                | InstallationState::DeletionPendingRequested
                | InstallationState::DeletionPendingInProgress
                | InstallationState::DeletionCancellationRequested
                | InstallationState::DeletionRequested
                | InstallationState::DeletionInProgress
                | InstallationState::DeletionFinalCleanup
        )
    }
}

/// A tenant instance of the managed application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installation {
    pub id: InstallationId,
    pub owner_id: String,
    pub group_id: Option<crate::group::GroupId>,
    /// The group `sequence` this installation was last reconciled against.
    /// Equal to the group's current sequence iff the member is up to date.
    pub group_sequence: Option<u64>,
    pub name: String,
    pub size: Size,
    pub affinity: Affinity,
    pub image: String,
    pub version: String,
    pub cr_version: String,
    pub database: DatabaseKind,
    pub filestore: FilestoreKind,
    /// Annotation requirements; every one must be present on a target cluster.
    pub annotations: BTreeSet<String>,
    pub state: InstallationState,
    /// Explicit deletion-pending expiry (epoch ms, 0 = use the configured
    /// grace period against the event log).
    pub deletion_pending_expiry: u64,
    /// Epoch ms after which the deletion supervisor begins teardown (0 = never).
    pub scheduled_deletion_time: u64,
    /// Blocks the scheduled-deletion sweep while set.
    pub deletion_locked: bool,
    pub create_at: u64,
    pub delete_at: u64,
    pub lock_acquired_by: Option<String>,
    pub lock_acquired_at: u64,
}

impl Installation {
    pub fn is_deleted(&self) -> bool {
        self.delete_at > 0
    }

    pub fn is_in_group(&self) -> bool {
        self.group_id.is_some()
    }

    /// Whether this member has caught up with its group's configuration (I6).
    pub fn up_to_date_with(&self, group: &Group) -> bool {
        self.group_sequence == Some(group.sequence)
    }

    /// Merge the group's target configuration into this installation and
    /// record the sequence it was merged at.
    pub fn merge_group_config(&mut self, group: &Group) {
        self.version = group.version.clone();
        self.image = group.image.clone();
        self.group_sequence = Some(group.sequence);
    }

    /// The compute request placement projects onto a candidate cluster.
    pub fn resource_request(&self) -> ResourceRequest {
        self.size.resource_request()
    }
}

/// Fleet-wide installation counts reported by the store.
///
/// `updating` is everything that is neither parked (`stable`, `hibernating`,
/// `deletion-pending`) nor deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationsStatus {
    pub total: u64,
    pub stable: u64,
    pub updating: u64,
    pub hibernating: u64,
    pub deletion_pending: u64,
}

crate::builder! {
    pub struct InstallationBuilder => Installation {
        into {
            owner_id: String = "owner-1",
            name: String = "test-installation",
            image: String = "gantry/app",
            version: String = "1.0.0",
            cr_version: String = "v1",
        }
        set {
            size: Size = Size::Small,
            affinity: Affinity = Affinity::MultiTenant,
            database: DatabaseKind = DatabaseKind::MultiTenant,
            filestore: FilestoreKind = FilestoreKind::SharedObjectStore,
            annotations: BTreeSet<String> = BTreeSet::new(),
            state: InstallationState = InstallationState::Stable,
            deletion_pending_expiry: u64 = 0,
            scheduled_deletion_time: u64 = 0,
            deletion_locked: bool = false,
            create_at: u64 = 0,
            delete_at: u64 = 0,
            lock_acquired_at: u64 = 0,
        }
        option {
            group_id: crate::group::GroupId = None,
            group_sequence: u64 = None,
            lock_acquired_by: String = None,
        }
        computed {
            id: InstallationId = InstallationId::new(),
        }
    }
}

#[cfg(test)]
#[path = "installation_tests.rs"]
mod tests;
