// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ClusterInstallation entity: the per-cluster realization of an installation.
//!
//! One installation may have many cluster installations historically; the
//! current design typically creates exactly one. Rows are soft-deleted like
//! every other entity until the provisioner confirms the workload is gone,
//! at which point the row is hard-deleted.

use crate::cluster::ClusterId;
use crate::installation::InstallationId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a cluster installation.
    pub struct ClusterInstallationId("cin-");
}

/// Lifecycle state of a cluster installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterInstallationState {
    CreationRequested,
    CreationFailed,
    Reconciling,
    /// The workload answers health checks but has not fully settled.
    Ready,
    Stable,
    DeletionRequested,
    DeletionFailed,
    Deleted,
}

crate::state_strings! {
    ClusterInstallationState {
        CreationRequested => "creation-requested",
        CreationFailed => "creation-failed",
        Reconciling => "reconciling",
        Ready => "ready",
        Stable => "stable",
        DeletionRequested => "deletion-requested",
        DeletionFailed => "deletion-failed",
        Deleted => "deleted",
    }
}

impl ClusterInstallationState {
    /// States the cluster-installation supervisor scans for.
    pub fn pending_work(&self) -> bool {
        matches!(
            self,
            ClusterInstallationState::CreationRequested
                | ClusterInstallationState::Reconciling
                | ClusterInstallationState::DeletionRequested
        )
    }
}

/// The realization of an installation on one specific cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterInstallation {
    pub id: ClusterInstallationId,
    pub cluster_id: ClusterId,
    pub installation_id: InstallationId,
    /// Namespace the workload runs in on the target cluster.
    pub namespace: String,
    pub cr_version: String,
    pub state: ClusterInstallationState,
    pub create_at: u64,
    pub delete_at: u64,
    pub lock_acquired_by: Option<String>,
    pub lock_acquired_at: u64,
}

impl ClusterInstallation {
    pub fn is_deleted(&self) -> bool {
        self.delete_at > 0
    }
}

crate::builder! {
    pub struct ClusterInstallationBuilder => ClusterInstallation {
        into {
            namespace: String = "ns-test",
            cr_version: String = "v1",
        }
        set {
            cluster_id: ClusterId = ClusterId::new(),
            installation_id: InstallationId = InstallationId::new(),
            state: ClusterInstallationState = ClusterInstallationState::Stable,
            create_at: u64 = 0,
            delete_at: u64 = 0,
            lock_acquired_at: u64 = 0,
        }
        option {
            lock_acquired_by: String = None,
        }
        computed {
            id: ClusterInstallationId = ClusterInstallationId::new(),
        }
    }
}

#[cfg(test)]
#[path = "cluster_installation_tests.rs"]
mod tests;
