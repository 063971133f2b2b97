// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Database restoration operations.
//!
//! A restoration rehydrates an installation's database from a finished
//! backup. While it runs, the installation itself is parked in
//! `db-restoration-in-progress`; `finalizing` hands the installation back in
//! the state recorded at request time.

use crate::cluster_installation::ClusterInstallationId;
use crate::installation::{InstallationId, InstallationState};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a database restoration operation.
    pub struct InstallationDbRestorationOperationId("res-");
}

/// Lifecycle state of a restoration operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RestorationState {
    Requested,
    InProgress,
    Finalizing,
    Succeeded,
    Failing,
    Failed,
    DeletionRequested,
    Deleted,
}

crate::state_strings! {
    RestorationState {
        Requested => "restoration-requested",
        InProgress => "in-progress",
        Finalizing => "finalizing",
        Succeeded => "succeeded",
        Failing => "failing",
        Failed => "failed",
        DeletionRequested => "deletion-requested",
        Deleted => "deleted",
    }
}

impl RestorationState {
    /// States the restoration supervisor scans for.
    pub fn pending_work(&self) -> bool {
        matches!(
            self,
            RestorationState::Requested
                | RestorationState::InProgress
                | RestorationState::Finalizing
                | RestorationState::Failing
                | RestorationState::DeletionRequested
        )
    }
}

/// One request to restore an installation's database from a backup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationDbRestorationOperation {
    pub id: InstallationDbRestorationOperationId,
    pub installation_id: InstallationId,
    pub backup_id: crate::backup::InstallationBackupId,
    /// Cluster installation the restore job ran against.
    pub cluster_installation_id: Option<ClusterInstallationId>,
    /// Installation state to hand back once the restore finishes.
    pub target_installation_state: InstallationState,
    pub state: RestorationState,
    pub create_at: u64,
    pub delete_at: u64,
    pub lock_acquired_by: Option<String>,
    pub lock_acquired_at: u64,
}

impl InstallationDbRestorationOperation {
    pub fn is_deleted(&self) -> bool {
        self.delete_at > 0
    }
}

crate::builder! {
    pub struct InstallationDbRestorationOperationBuilder => InstallationDbRestorationOperation {
        set {
            installation_id: InstallationId = InstallationId::new(),
            backup_id: crate::backup::InstallationBackupId = crate::backup::InstallationBackupId::new(),
            target_installation_state: InstallationState = InstallationState::Hibernating,
            state: RestorationState = RestorationState::Requested,
            create_at: u64 = 0,
            delete_at: u64 = 0,
            lock_acquired_at: u64 = 0,
        }
        option {
            cluster_installation_id: ClusterInstallationId = None,
            lock_acquired_by: String = None,
        }
        computed {
            id: InstallationDbRestorationOperationId = InstallationDbRestorationOperationId::new(),
        }
    }
}

#[cfg(test)]
#[path = "restoration_tests.rs"]
mod tests;
