// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backup, restore, and database-migration job operators.
//!
//! Operators run jobs on a workload cluster and report their progress. The
//! status checks return `None` while a job is still running and `Some` with
//! the job's reported timestamp once it finished.

use async_trait::async_trait;
use gantry_core::{
    Cluster, DataResidence, DatabaseKind, Installation, InstallationBackup,
    InstallationDbMigrationOperation, InstallationDbRestorationOperation,
};
use thiserror::Error;

/// Failure reported by an operator call.
#[derive(Debug, Error)]
pub enum OperatorError {
    /// The job's backoff limit was exhausted; the operation will never
    /// finish on its own. Mapped to the resource's failed state.
    #[error("job backoff limit reached: {0}")]
    BackoffLimitReached(String),

    #[error("transient operator failure: {0}")]
    Transient(String),
}

impl OperatorError {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperatorError::BackoffLimitReached(_))
    }
}

/// Runs backup jobs against a hibernated installation.
#[async_trait]
pub trait BackupOperator: Send + Sync {
    /// Start a backup job. Returns where the data will reside.
    async fn trigger_backup(
        &self,
        backup: &InstallationBackup,
        installation: &Installation,
        cluster: &Cluster,
    ) -> Result<DataResidence, OperatorError>;

    /// Poll the backup job. `Some(start_at)` once it finished successfully.
    async fn check_backup_status(
        &self,
        backup: &InstallationBackup,
        cluster: &Cluster,
    ) -> Result<Option<u64>, OperatorError>;

    /// Remove the job remnants and the stored data for a deleted backup.
    async fn cleanup_backup(
        &self,
        backup: &InstallationBackup,
        cluster: Option<&Cluster>,
    ) -> Result<(), OperatorError>;
}

/// Runs restore jobs that rehydrate an installation from a backup.
#[async_trait]
pub trait RestoreOperator: Send + Sync {
    /// Start a restore job feeding the backup's data into the installation's
    /// current database.
    async fn trigger_restore(
        &self,
        restoration: &InstallationDbRestorationOperation,
        installation: &Installation,
        backup: &InstallationBackup,
        cluster: &Cluster,
    ) -> Result<(), OperatorError>;

    /// Poll the restore job. `Some(complete_at)` once it finished.
    async fn check_restore_status(
        &self,
        restoration: &InstallationDbRestorationOperation,
        cluster: &Cluster,
    ) -> Result<Option<u64>, OperatorError>;

    /// Remove the finished restore job's remnants.
    async fn cleanup_restore_job(
        &self,
        restoration: &InstallationDbRestorationOperation,
        cluster: &Cluster,
    ) -> Result<(), OperatorError>;
}

/// Moves an installation's database between backing kinds.
#[async_trait]
pub trait DbMigrationOperator: Send + Sync {
    /// Detach the installation's logical database from the source backing.
    async fn migrate_out(
        &self,
        installation: &Installation,
        source: DatabaseKind,
    ) -> Result<(), OperatorError>;

    /// Provision the installation's logical database on the destination
    /// backing.
    async fn migrate_to(
        &self,
        installation: &Installation,
        destination: DatabaseKind,
    ) -> Result<(), OperatorError>;

    /// Drop the source-side remnants after a migration fully succeeded.
    async fn teardown_migrated(
        &self,
        installation: &Installation,
        source: DatabaseKind,
    ) -> Result<(), OperatorError>;

    /// Point the installation back at the source backing after a failed
    /// migration.
    async fn rollback_migration(
        &self,
        installation: &Installation,
        migration: &InstallationDbMigrationOperation,
    ) -> Result<(), OperatorError>;
}
