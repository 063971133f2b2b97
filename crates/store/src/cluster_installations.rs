// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster-installation store operations.

use crate::error::StoreError;
use async_trait::async_trait;
use gantry_core::{
    ClusterId, ClusterInstallation, ClusterInstallationId, ClusterInstallationState,
    InstallationId,
};

/// Query filter for cluster installations.
#[derive(Debug, Clone, Default)]
pub struct ClusterInstallationFilter {
    pub cluster_id: Option<ClusterId>,
    pub installation_id: Option<InstallationId>,
    pub include_deleted: bool,
}

/// Store operations on cluster installations.
#[async_trait]
pub trait ClusterInstallationStore: Send + Sync {
    async fn get_cluster_installation(
        &self,
        id: &ClusterInstallationId,
    ) -> Result<Option<ClusterInstallation>, StoreError>;

    async fn get_cluster_installations(
        &self,
        filter: &ClusterInstallationFilter,
    ) -> Result<Vec<ClusterInstallation>, StoreError>;

    /// Cluster installations in a pending-work state with no lock held.
    async fn get_unlocked_cluster_installations_pending_work(
        &self,
    ) -> Result<Vec<ClusterInstallation>, StoreError>;

    /// Persist a new cluster installation, stamping `create_at`.
    async fn create_cluster_installation(
        &self,
        cluster_installation: ClusterInstallation,
    ) -> Result<ClusterInstallation, StoreError>;

    async fn update_cluster_installation(
        &self,
        cluster_installation: &ClusterInstallation,
    ) -> Result<(), StoreError>;

    /// State-only fast path.
    async fn update_cluster_installation_state(
        &self,
        id: &ClusterInstallationId,
        state: ClusterInstallationState,
    ) -> Result<(), StoreError>;

    /// Hard-delete a row whose workload the provisioner has confirmed gone.
    ///
    /// Cluster installations are the one entity that is removed rather than
    /// soft-deleted; the terminal state lives on in the event trail.
    async fn delete_cluster_installation(
        &self,
        id: &ClusterInstallationId,
    ) -> Result<(), StoreError>;

    /// Try to take the advisory lock. `Ok(false)` means already held.
    async fn lock_cluster_installation(
        &self,
        id: &ClusterInstallationId,
        locker_id: &str,
    ) -> Result<bool, StoreError>;

    /// Lock a set of rows atomically: either every row is acquired or none.
    async fn lock_cluster_installations(
        &self,
        ids: &[ClusterInstallationId],
        locker_id: &str,
    ) -> Result<bool, StoreError>;

    /// Release the advisory lock. `Ok(false)` means it was not held by
    /// `locker_id` (and `force` was not set).
    async fn unlock_cluster_installation(
        &self,
        id: &ClusterInstallationId,
        locker_id: &str,
        force: bool,
    ) -> Result<bool, StoreError>;

    /// Release a set of locks; rows not held by `locker_id` are skipped.
    async fn unlock_cluster_installations(
        &self,
        ids: &[ClusterInstallationId],
        locker_id: &str,
        force: bool,
    ) -> Result<(), StoreError>;
}
