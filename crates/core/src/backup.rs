// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Installation backup records.
//!
//! A backup snapshots a hibernated installation's data into object storage.
//! The backup supervisor drives the record from `backup-requested` through
//! the operator-run job to a terminal outcome; rows are soft-deleted after
//! their stored data has been cleaned up.

use crate::cluster_installation::ClusterInstallationId;
use crate::installation::InstallationId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for an installation backup.
    pub struct InstallationBackupId("bck-");
}

/// Where a backup's data lives in object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataResidence {
    pub url: String,
    pub bucket: String,
    pub path: String,
}

/// Lifecycle state of a backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallationBackupState {
    Requested,
    InProgress,
    Succeeded,
    Failed,
    DeletionRequested,
    Deleted,
}

crate::state_strings! {
    InstallationBackupState {
        Requested => "backup-requested",
        InProgress => "backup-in-progress",
        Succeeded => "backup-succeeded",
        Failed => "backup-failed",
        DeletionRequested => "deletion-requested",
        Deleted => "deleted",
    }
}

impl InstallationBackupState {
    /// States the backup supervisor scans for.
    pub fn pending_work(&self) -> bool {
        matches!(
            self,
            InstallationBackupState::Requested
                | InstallationBackupState::InProgress
                | InstallationBackupState::DeletionRequested
        )
    }

    /// Whether the backup job is still running against a cluster.
    ///
    /// Cluster installations hosting a running backup refuse deletion.
    pub fn running(&self) -> bool {
        matches!(
            self,
            InstallationBackupState::Requested | InstallationBackupState::InProgress
        )
    }
}

/// A snapshot of one installation's data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationBackup {
    pub id: InstallationBackupId,
    pub installation_id: InstallationId,
    /// Cluster installation whose cluster ran the backup job.
    pub cluster_installation_id: Option<ClusterInstallationId>,
    pub data_residence: Option<DataResidence>,
    pub state: InstallationBackupState,
    /// Epoch ms the backup job reported as its start time (0 = not started).
    pub start_at: u64,
    pub create_at: u64,
    pub delete_at: u64,
    pub lock_acquired_by: Option<String>,
    pub lock_acquired_at: u64,
}

impl InstallationBackup {
    pub fn is_deleted(&self) -> bool {
        self.delete_at > 0
    }
}

crate::builder! {
    pub struct InstallationBackupBuilder => InstallationBackup {
        set {
            installation_id: InstallationId = InstallationId::new(),
            state: InstallationBackupState = InstallationBackupState::Requested,
            start_at: u64 = 0,
            create_at: u64 = 0,
            delete_at: u64 = 0,
            lock_acquired_at: u64 = 0,
        }
        option {
            cluster_installation_id: ClusterInstallationId = None,
            data_residence: DataResidence = None,
            lock_acquired_by: String = None,
        }
        computed {
            id: InstallationBackupId = InstallationBackupId::new(),
        }
    }
}

#[cfg(test)]
#[path = "backup_tests.rs"]
mod tests;
