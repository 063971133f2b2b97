// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Database migration operations.
//!
//! A migration moves an installation's database between backing kinds. It is
//! a composite workflow: back up on the source, switch the installation's
//! database descriptor, refresh workload secrets, then restore onto the
//! destination. The backup and restoration legs are ordinary backup /
//! restoration records driven by their own supervisors; the migration record
//! tracks the overall progress and owns the outcome mapping.

use crate::backup::InstallationBackupId;
use crate::installation::{DatabaseKind, InstallationId};
use crate::restoration::InstallationDbRestorationOperationId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a database migration operation.
    pub struct InstallationDbMigrationOperationId("mig-");
}

/// Lifecycle state of a migration operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationState {
    Requested,
    BackupInProgress,
    DatabaseSwitch,
    RefreshSecrets,
    TriggerRestoration,
    RestorationInProgress,
    UpdatingInstallationConfig,
    Finalizing,
    Succeeded,
    Failing,
    Failed,
}

crate::state_strings! {
    MigrationState {
        Requested => "requested",
        BackupInProgress => "backup-in-progress",
        DatabaseSwitch => "database-switch",
        RefreshSecrets => "refresh-secrets",
        TriggerRestoration => "trigger-restoration",
        RestorationInProgress => "restoration-in-progress",
        UpdatingInstallationConfig => "updating-installation-config",
        Finalizing => "finalizing",
        Succeeded => "succeeded",
        Failing => "failing",
        Failed => "failed",
    }
}

impl MigrationState {
    /// States the migration supervisor scans for.
    pub fn pending_work(&self) -> bool {
        !matches!(
            self,
            MigrationState::Succeeded | MigrationState::Failed
        )
    }
}

/// One request to move an installation's database to a different backing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationDbMigrationOperation {
    pub id: InstallationDbMigrationOperationId,
    pub installation_id: InstallationId,
    pub source_database: DatabaseKind,
    pub destination_database: DatabaseKind,
    /// Backup leg, created when the migration starts.
    pub backup_id: Option<InstallationBackupId>,
    /// Restoration leg, created after the database switch.
    pub restoration_id: Option<InstallationDbRestorationOperationId>,
    pub state: MigrationState,
    pub create_at: u64,
    pub delete_at: u64,
    pub lock_acquired_by: Option<String>,
    pub lock_acquired_at: u64,
}

impl InstallationDbMigrationOperation {
    pub fn is_deleted(&self) -> bool {
        self.delete_at > 0
    }
}

crate::builder! {
    pub struct InstallationDbMigrationOperationBuilder => InstallationDbMigrationOperation {
        set {
            installation_id: InstallationId = InstallationId::new(),
            source_database: DatabaseKind = DatabaseKind::SingleTenant,
            destination_database: DatabaseKind = DatabaseKind::MultiTenant,
            state: MigrationState = MigrationState::Requested,
            create_at: u64 = 0,
            delete_at: u64 = 0,
            lock_acquired_at: u64 = 0,
        }
        option {
            backup_id: InstallationBackupId = None,
            restoration_id: InstallationDbRestorationOperationId = None,
            lock_acquired_by: String = None,
        }
        computed {
            id: InstallationDbMigrationOperationId = InstallationDbMigrationOperationId::new(),
        }
    }
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
