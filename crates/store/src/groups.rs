// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Group store operations.

use crate::error::StoreError;
use async_trait::async_trait;
use gantry_core::{Group, GroupId, InstallationId};

/// Snapshot of a group's rollout progress.
///
/// The store is authoritative for what counts as rolling: members whose
/// state is neither `stable` nor `hibernating` (deleted rows excluded).
/// `ids_to_be_rolled` are the stable members whose `group_sequence` trails
/// the group's current `sequence`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupRollingMetadata {
    pub installations_total: u64,
    pub installations_rolling: u64,
    pub ids_to_be_rolled: Vec<InstallationId>,
}

/// Store operations on groups.
#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn get_group(&self, id: &GroupId) -> Result<Option<Group>, StoreError>;

    /// Non-deleted groups with no lock held.
    async fn get_unlocked_groups_pending_work(&self) -> Result<Vec<Group>, StoreError>;

    async fn get_group_rolling_metadata(
        &self,
        id: &GroupId,
    ) -> Result<GroupRollingMetadata, StoreError>;

    async fn create_group(&self, group: Group) -> Result<Group, StoreError>;

    /// Try to take the advisory lock. `Ok(false)` means already held.
    async fn lock_group(&self, id: &GroupId, locker_id: &str) -> Result<bool, StoreError>;

    /// Release the advisory lock. `Ok(false)` means it was not held by
    /// `locker_id` (and `force` was not set).
    async fn unlock_group(
        &self,
        id: &GroupId,
        locker_id: &str,
        force: bool,
    ) -> Result<bool, StoreError>;
}
