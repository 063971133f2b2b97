// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster entity.
//!
//! Clusters are created and provisioned by an external API and cluster
//! supervisor; the engine consumes them as scheduling targets. Placement
//! only ever selects `stable` clusters and may write `resize-requested`
//! back when a candidate needs out-of-band growth.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

crate::define_id! {
    /// Unique identifier for a compute cluster.
    pub struct ClusterId("cls-");
}

/// Lifecycle state of a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterState {
    CreationRequested,
    Provisioning,
    CreationFailed,
    Stable,
    UpgradeRequested,
    Upgrading,
    ResizeRequested,
    Resizing,
    DeletionRequested,
    Deleted,
}

crate::state_strings! {
    ClusterState {
        CreationRequested => "creation-requested",
        Provisioning => "provisioning",
        CreationFailed => "creation-failed",
        Stable => "stable",
        UpgradeRequested => "upgrade-requested",
        Upgrading => "upgrading",
        ResizeRequested => "resize-requested",
        Resizing => "resizing",
        DeletionRequested => "deletion-requested",
        Deleted => "deleted",
    }
}

/// A shared compute cluster that installations are scheduled onto.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub state: ClusterState,
    /// Worker node count reported by the cluster provisioner.
    pub node_count: u64,
    /// Cluster software version reported by the cluster provisioner.
    pub version: String,
    /// Annotations offered to installations' annotation requirements.
    pub annotations: BTreeSet<String>,
    /// Whether the scheduler may place new installations here.
    pub allow_installations: bool,
    pub create_at: u64,
    pub delete_at: u64,
    pub lock_acquired_by: Option<String>,
    pub lock_acquired_at: u64,
}

impl Cluster {
    pub fn is_deleted(&self) -> bool {
        self.delete_at > 0
    }

    /// Whether this cluster can be offered to placement at all.
    pub fn schedulable(&self) -> bool {
        self.allow_installations && self.state == ClusterState::Stable && !self.is_deleted()
    }

    /// Whether the cluster offers every annotation the installation requires.
    pub fn satisfies_annotations(&self, required: &BTreeSet<String>) -> bool {
        required.is_subset(&self.annotations)
    }
}

crate::builder! {
    pub struct ClusterBuilder => Cluster {
        into {
            version: String = "1.31.0",
        }
        set {
            state: ClusterState = ClusterState::Stable,
            node_count: u64 = 3,
            annotations: BTreeSet<String> = BTreeSet::new(),
            allow_installations: bool = true,
            create_at: u64 = 0,
            delete_at: u64 = 0,
            lock_acquired_at: u64 = 0,
        }
        option {
            lock_acquired_by: String = None,
        }
        computed {
            id: ClusterId = ClusterId::new(),
        }
    }
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod tests;
