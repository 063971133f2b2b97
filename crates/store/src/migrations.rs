// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Database-migration store operations.

use crate::error::StoreError;
use async_trait::async_trait;
use gantry_core::{
    InstallationDbMigrationOperation, InstallationDbMigrationOperationId, InstallationId,
    MigrationState,
};

/// Store operations on database migration operations.
#[async_trait]
pub trait MigrationStore: Send + Sync {
    async fn get_installation_db_migration(
        &self,
        id: &InstallationDbMigrationOperationId,
    ) -> Result<Option<InstallationDbMigrationOperation>, StoreError>;

    /// Non-deleted migrations for one installation.
    async fn get_installation_db_migrations(
        &self,
        installation_id: &InstallationId,
    ) -> Result<Vec<InstallationDbMigrationOperation>, StoreError>;

    /// Migrations in a pending-work state with no lock held.
    async fn get_unlocked_installation_db_migrations_pending_work(
        &self,
    ) -> Result<Vec<InstallationDbMigrationOperation>, StoreError>;

    /// Persist a new migration record, stamping `create_at`.
    async fn create_installation_db_migration(
        &self,
        migration: InstallationDbMigrationOperation,
    ) -> Result<InstallationDbMigrationOperation, StoreError>;

    async fn update_installation_db_migration(
        &self,
        migration: &InstallationDbMigrationOperation,
    ) -> Result<(), StoreError>;

    /// State-only fast path.
    async fn update_installation_db_migration_state(
        &self,
        id: &InstallationDbMigrationOperationId,
        state: MigrationState,
    ) -> Result<(), StoreError>;

    /// Soft-delete: stamps `delete_at`.
    async fn delete_installation_db_migration(
        &self,
        id: &InstallationDbMigrationOperationId,
    ) -> Result<(), StoreError>;

    /// Try to take the advisory lock. `Ok(false)` means already held.
    async fn lock_installation_db_migration(
        &self,
        id: &InstallationDbMigrationOperationId,
        locker_id: &str,
    ) -> Result<bool, StoreError>;

    /// Release the advisory lock. `Ok(false)` means it was not held by
    /// `locker_id` (and `force` was not set).
    async fn unlock_installation_db_migration(
        &self,
        id: &InstallationDbMigrationOperationId,
        locker_id: &str,
        force: bool,
    ) -> Result<bool, StoreError>;
}
