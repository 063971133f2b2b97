// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backup store operations.

use crate::error::StoreError;
use async_trait::async_trait;
use gantry_core::{
    ClusterInstallationId, InstallationBackup, InstallationBackupId, InstallationBackupState,
    InstallationId,
};

/// Query filter for backups.
#[derive(Debug, Clone, Default)]
pub struct BackupFilter {
    pub installation_id: Option<InstallationId>,
    pub cluster_installation_id: Option<ClusterInstallationId>,
    pub states: Vec<InstallationBackupState>,
    pub include_deleted: bool,
}

/// Store operations on installation backups.
#[async_trait]
pub trait BackupStore: Send + Sync {
    async fn get_installation_backup(
        &self,
        id: &InstallationBackupId,
    ) -> Result<Option<InstallationBackup>, StoreError>;

    async fn get_installation_backups(
        &self,
        filter: &BackupFilter,
    ) -> Result<Vec<InstallationBackup>, StoreError>;

    /// Backups in a pending-work state with no lock held.
    async fn get_unlocked_installation_backups_pending_work(
        &self,
    ) -> Result<Vec<InstallationBackup>, StoreError>;

    /// Persist a new backup record, stamping `create_at`.
    async fn create_installation_backup(
        &self,
        backup: InstallationBackup,
    ) -> Result<InstallationBackup, StoreError>;

    async fn update_installation_backup(
        &self,
        backup: &InstallationBackup,
    ) -> Result<(), StoreError>;

    /// State-only fast path.
    async fn update_installation_backup_state(
        &self,
        id: &InstallationBackupId,
        state: InstallationBackupState,
    ) -> Result<(), StoreError>;

    /// Soft-delete: stamps `delete_at`.
    async fn delete_installation_backup(
        &self,
        id: &InstallationBackupId,
    ) -> Result<(), StoreError>;

    /// Try to take the advisory lock. `Ok(false)` means already held.
    async fn lock_installation_backup(
        &self,
        id: &InstallationBackupId,
        locker_id: &str,
    ) -> Result<bool, StoreError>;

    /// Release the advisory lock. `Ok(false)` means it was not held by
    /// `locker_id` (and `force` was not set).
    async fn unlock_installation_backup(
        &self,
        id: &InstallationBackupId,
        locker_id: &str,
        force: bool,
    ) -> Result<bool, StoreError>;
}
