// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Installation store operations.

use crate::error::StoreError;
use async_trait::async_trait;
use gantry_core::{Installation, InstallationId, InstallationState, InstallationsStatus};

/// Query filter for installations.
///
/// Empty `states` means any state. Soft-deleted rows are excluded unless
/// `include_deleted` is set.
#[derive(Debug, Clone, Default)]
pub struct InstallationFilter {
    pub group_id: Option<gantry_core::GroupId>,
    pub states: Vec<InstallationState>,
    pub include_deleted: bool,
}

/// Store operations on installations.
#[async_trait]
pub trait InstallationStore: Send + Sync {
    async fn get_installation(&self, id: &InstallationId) -> Result<Option<Installation>, StoreError>;

    async fn get_installations(
        &self,
        filter: &InstallationFilter,
    ) -> Result<Vec<Installation>, StoreError>;

    /// Installations in a pending-work state with no lock held.
    async fn get_unlocked_installations_pending_work(
        &self,
    ) -> Result<Vec<Installation>, StoreError>;

    /// Unlocked installations with a scheduled deletion time set and deletion
    /// not locked, regardless of whether the time has passed yet.
    async fn get_unlocked_installations_with_scheduled_deletion(
        &self,
    ) -> Result<Vec<Installation>, StoreError>;

    /// Non-deleted installations realized on the given cluster.
    async fn get_installations_for_cluster(
        &self,
        cluster_id: &gantry_core::ClusterId,
    ) -> Result<Vec<Installation>, StoreError>;

    /// Fleet-wide installation counts.
    async fn get_installations_status(&self) -> Result<InstallationsStatus, StoreError>;

    /// Persist a new installation, stamping `create_at`.
    async fn create_installation(
        &self,
        installation: Installation,
    ) -> Result<Installation, StoreError>;

    /// Full-row update. Lock columns are not written; use `lock`/`unlock`.
    async fn update_installation(&self, installation: &Installation) -> Result<(), StoreError>;

    /// State-only fast path.
    async fn update_installation_state(
        &self,
        id: &InstallationId,
        state: InstallationState,
    ) -> Result<(), StoreError>;

    /// Soft-delete: stamps `delete_at`.
    async fn delete_installation(&self, id: &InstallationId) -> Result<(), StoreError>;

    /// Try to take the advisory lock. `Ok(false)` means already held.
    async fn lock_installation(
        &self,
        id: &InstallationId,
        locker_id: &str,
    ) -> Result<bool, StoreError>;

    /// Release the advisory lock. `Ok(false)` means it was not held by
    /// `locker_id` (and `force` was not set).
    async fn unlock_installation(
        &self,
        id: &InstallationId,
        locker_id: &str,
        force: bool,
    ) -> Result<bool, StoreError>;
}
