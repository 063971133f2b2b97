// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Database-restoration store operations.

use crate::error::StoreError;
use async_trait::async_trait;
use gantry_core::{
    InstallationDbRestorationOperation, InstallationDbRestorationOperationId, InstallationId,
    RestorationState,
};

/// Store operations on database restoration operations.
#[async_trait]
pub trait RestorationStore: Send + Sync {
    async fn get_installation_db_restoration(
        &self,
        id: &InstallationDbRestorationOperationId,
    ) -> Result<Option<InstallationDbRestorationOperation>, StoreError>;

    /// Non-deleted restorations for one installation.
    async fn get_installation_db_restorations(
        &self,
        installation_id: &InstallationId,
    ) -> Result<Vec<InstallationDbRestorationOperation>, StoreError>;

    /// Restorations in a pending-work state with no lock held.
    async fn get_unlocked_installation_db_restorations_pending_work(
        &self,
    ) -> Result<Vec<InstallationDbRestorationOperation>, StoreError>;

    /// Persist a new restoration record, stamping `create_at`.
    async fn create_installation_db_restoration(
        &self,
        restoration: InstallationDbRestorationOperation,
    ) -> Result<InstallationDbRestorationOperation, StoreError>;

    async fn update_installation_db_restoration(
        &self,
        restoration: &InstallationDbRestorationOperation,
    ) -> Result<(), StoreError>;

    /// State-only fast path.
    async fn update_installation_db_restoration_state(
        &self,
        id: &InstallationDbRestorationOperationId,
        state: RestorationState,
    ) -> Result<(), StoreError>;

    /// Soft-delete: stamps `delete_at`.
    async fn delete_installation_db_restoration(
        &self,
        id: &InstallationDbRestorationOperationId,
    ) -> Result<(), StoreError>;

    /// Try to take the advisory lock. `Ok(false)` means already held.
    async fn lock_installation_db_restoration(
        &self,
        id: &InstallationDbRestorationOperationId,
        locker_id: &str,
    ) -> Result<bool, StoreError>;

    /// Release the advisory lock. `Ok(false)` means it was not held by
    /// `locker_id` (and `force` was not set).
    async fn unlock_installation_db_restoration(
        &self,
        id: &InstallationDbRestorationOperationId,
        locker_id: &str,
        force: bool,
    ) -> Result<bool, StoreError>;
}
