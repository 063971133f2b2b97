// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory store for tests.
//!
//! Implements the full store surface over a single state bag behind one
//! mutex. Advisory locks use the same compare-and-swap semantics the
//! production store enforces per row: at most one holder, `lock` returns
//! `false` when held, `unlock` returns `false` when the caller does not hold
//! the row and `force` is not set.

use crate::backups::{BackupFilter, BackupStore};
use crate::cluster_installations::{ClusterInstallationFilter, ClusterInstallationStore};
use crate::clusters::ClusterStore;
use crate::error::StoreError;
use crate::events::EventStore;
use crate::groups::{GroupRollingMetadata, GroupStore};
use crate::installations::{InstallationFilter, InstallationStore};
use crate::migrations::MigrationStore;
use crate::restorations::RestorationStore;
use async_trait::async_trait;
use gantry_core::{
    Clock, Cluster, ClusterId, ClusterInstallation, ClusterInstallationId,
    ClusterInstallationState, ClusterState, Group, GroupId, Installation, InstallationBackup,
    InstallationBackupId, InstallationBackupState, InstallationDbMigrationOperation,
    InstallationDbMigrationOperationId, InstallationDbRestorationOperation,
    InstallationDbRestorationOperationId, InstallationId, InstallationState, InstallationsStatus,
    MigrationState, ResourceType, RestorationState, StateChangeEvent, SystemClock,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// In-memory implementation of every store trait.
pub struct MemoryStore<C: Clock = SystemClock> {
    state: Mutex<State>,
    clock: C,
}

#[derive(Default)]
struct State {
    clusters: BTreeMap<String, Cluster>,
    installations: BTreeMap<String, Installation>,
    cluster_installations: BTreeMap<String, ClusterInstallation>,
    groups: BTreeMap<String, Group>,
    backups: BTreeMap<String, InstallationBackup>,
    restorations: BTreeMap<String, InstallationDbRestorationOperation>,
    migrations: BTreeMap<String, InstallationDbMigrationOperation>,
    events: Vec<StateChangeEvent>,
}

impl MemoryStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { state: Mutex::new(State::default()), clock }
    }

    fn now(&self) -> u64 {
        self.clock.epoch_ms()
    }
}

/// Access to the shared lock and deletion columns of one row.
trait Lockable {
    fn lock_holder(&self) -> Option<&str>;
    fn set_lock(&mut self, holder: Option<String>, at: u64);
    fn soft_deleted(&self) -> bool;
}

macro_rules! impl_lockable {
    ($( $ty:ty ),+ $(,)?) => {
        $(
            impl Lockable for $ty {
                fn lock_holder(&self) -> Option<&str> {
                    self.lock_acquired_by.as_deref()
                }

                fn set_lock(&mut self, holder: Option<String>, at: u64) {
                    self.lock_acquired_by = holder;
                    self.lock_acquired_at = at;
                }

                fn soft_deleted(&self) -> bool {
                    self.delete_at > 0
                }
            }
        )+
    };
}

impl_lockable!(
    Installation,
    ClusterInstallation,
    Group,
    InstallationBackup,
    InstallationDbRestorationOperation,
    InstallationDbMigrationOperation,
);

fn try_lock_row<T: Lockable>(row: Option<&mut T>, locker_id: &str, now: u64) -> bool {
    let Some(row) = row else { return false };
    if row.soft_deleted() || row.lock_holder().is_some() {
        return false;
    }
    row.set_lock(Some(locker_id.to_string()), now);
    true
}

fn unlock_row<T: Lockable>(row: Option<&mut T>, locker_id: &str, force: bool) -> bool {
    let Some(row) = row else { return false };
    let held_by_caller = row.lock_holder() == Some(locker_id);
    if held_by_caller || (force && row.lock_holder().is_some()) {
        row.set_lock(None, 0);
        return true;
    }
    false
}

fn insert_new<T: Clone>(
    map: &mut BTreeMap<String, T>,
    entity: &'static str,
    id: String,
    row: T,
) -> Result<T, StoreError> {
    if map.contains_key(&id) {
        return Err(StoreError::Backend(format!("duplicate {entity} id {id}")));
    }
    map.insert(id, row.clone());
    Ok(row)
}

#[async_trait]
impl<C: Clock> InstallationStore for MemoryStore<C> {
    async fn get_installation(
        &self,
        id: &InstallationId,
    ) -> Result<Option<Installation>, StoreError> {
        Ok(self.state.lock().installations.get(id.as_str()).cloned())
    }

    async fn get_installations(
        &self,
        filter: &InstallationFilter,
    ) -> Result<Vec<Installation>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .installations
            .values()
            .filter(|i| filter.include_deleted || !i.is_deleted())
            .filter(|i| filter.group_id.is_none() || i.group_id == filter.group_id)
            .filter(|i| filter.states.is_empty() || filter.states.contains(&i.state))
            .cloned()
            .collect())
    }

    async fn get_unlocked_installations_pending_work(
        &self,
    ) -> Result<Vec<Installation>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .installations
            .values()
            .filter(|i| !i.is_deleted() && i.state.pending_work() && i.lock_acquired_by.is_none())
            .cloned()
            .collect())
    }

    async fn get_unlocked_installations_with_scheduled_deletion(
        &self,
    ) -> Result<Vec<Installation>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .installations
            .values()
            .filter(|i| {
                !i.is_deleted()
                    && i.scheduled_deletion_time > 0
                    && !i.deletion_locked
                    && i.lock_acquired_by.is_none()
            })
            .cloned()
            .collect())
    }

    async fn get_installations_for_cluster(
        &self,
        cluster_id: &ClusterId,
    ) -> Result<Vec<Installation>, StoreError> {
        let state = self.state.lock();
        let mut out = Vec::new();
        for ci in state.cluster_installations.values() {
            if ci.is_deleted() || &ci.cluster_id != cluster_id {
                continue;
            }
            if let Some(installation) = state.installations.get(ci.installation_id.as_str()) {
                if !installation.is_deleted() {
                    out.push(installation.clone());
                }
            }
        }
        Ok(out)
    }

    async fn get_installations_status(&self) -> Result<InstallationsStatus, StoreError> {
        let state = self.state.lock();
        let mut status = InstallationsStatus::default();
        for installation in state.installations.values() {
            if installation.is_deleted() {
                continue;
            }
            status.total += 1;
            match installation.state {
                InstallationState::Stable => status.stable += 1,
                InstallationState::Hibernating => status.hibernating += 1,
                InstallationState::DeletionPending => status.deletion_pending += 1,
                _ => {}
            }
        }
        status.updating =
            status.total - status.stable - status.hibernating - status.deletion_pending;
        Ok(status)
    }

    async fn create_installation(
        &self,
        mut installation: Installation,
    ) -> Result<Installation, StoreError> {
        installation.create_at = self.now();
        let mut state = self.state.lock();
        let id = installation.id.as_str().to_string();
        insert_new(&mut state.installations, "installation", id, installation)
    }

    async fn update_installation(&self, installation: &Installation) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let existing = state
            .installations
            .get_mut(installation.id.as_str())
            .ok_or_else(|| StoreError::not_found("installation", installation.id.as_str()))?;
        let mut updated = installation.clone();
        updated.create_at = existing.create_at;
        updated.delete_at = existing.delete_at;
        updated.lock_acquired_by = existing.lock_acquired_by.clone();
        updated.lock_acquired_at = existing.lock_acquired_at;
        *existing = updated;
        Ok(())
    }

    async fn update_installation_state(
        &self,
        id: &InstallationId,
        new_state: InstallationState,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let existing = state
            .installations
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::not_found("installation", id.as_str()))?;
        existing.state = new_state;
        Ok(())
    }

    async fn delete_installation(&self, id: &InstallationId) -> Result<(), StoreError> {
        let now = self.now();
        let mut state = self.state.lock();
        let existing = state
            .installations
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::not_found("installation", id.as_str()))?;
        if existing.delete_at == 0 {
            existing.delete_at = now;
        }
        Ok(())
    }

    async fn lock_installation(
        &self,
        id: &InstallationId,
        locker_id: &str,
    ) -> Result<bool, StoreError> {
        let now = self.now();
        let mut state = self.state.lock();
        Ok(try_lock_row(state.installations.get_mut(id.as_str()), locker_id, now))
    }

    async fn unlock_installation(
        &self,
        id: &InstallationId,
        locker_id: &str,
        force: bool,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        Ok(unlock_row(state.installations.get_mut(id.as_str()), locker_id, force))
    }
}

#[async_trait]
impl<C: Clock> ClusterStore for MemoryStore<C> {
    async fn get_cluster(&self, id: &ClusterId) -> Result<Option<Cluster>, StoreError> {
        Ok(self.state.lock().clusters.get(id.as_str()).cloned())
    }

    async fn get_clusters(&self) -> Result<Vec<Cluster>, StoreError> {
        let state = self.state.lock();
        Ok(state.clusters.values().filter(|c| !c.is_deleted()).cloned().collect())
    }

    async fn create_cluster(&self, mut cluster: Cluster) -> Result<Cluster, StoreError> {
        cluster.create_at = self.now();
        let mut state = self.state.lock();
        let id = cluster.id.as_str().to_string();
        insert_new(&mut state.clusters, "cluster", id, cluster)
    }

    async fn update_cluster_state(
        &self,
        id: &ClusterId,
        new_state: ClusterState,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let existing = state
            .clusters
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::not_found("cluster", id.as_str()))?;
        existing.state = new_state;
        Ok(())
    }
}

#[async_trait]
impl<C: Clock> ClusterInstallationStore for MemoryStore<C> {
    async fn get_cluster_installation(
        &self,
        id: &ClusterInstallationId,
    ) -> Result<Option<ClusterInstallation>, StoreError> {
        Ok(self.state.lock().cluster_installations.get(id.as_str()).cloned())
    }

    async fn get_cluster_installations(
        &self,
        filter: &ClusterInstallationFilter,
    ) -> Result<Vec<ClusterInstallation>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .cluster_installations
            .values()
            .filter(|ci| filter.include_deleted || !ci.is_deleted())
            .filter(|ci| filter.cluster_id.is_none() || Some(&ci.cluster_id) == filter.cluster_id.as_ref())
            .filter(|ci| {
                filter.installation_id.is_none()
                    || Some(&ci.installation_id) == filter.installation_id.as_ref()
            })
            .cloned()
            .collect())
    }

    async fn get_unlocked_cluster_installations_pending_work(
        &self,
    ) -> Result<Vec<ClusterInstallation>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .cluster_installations
            .values()
            .filter(|ci| {
                !ci.is_deleted() && ci.state.pending_work() && ci.lock_acquired_by.is_none()
            })
            .cloned()
            .collect())
    }

    async fn create_cluster_installation(
        &self,
        mut cluster_installation: ClusterInstallation,
    ) -> Result<ClusterInstallation, StoreError> {
        cluster_installation.create_at = self.now();
        let mut state = self.state.lock();
        let id = cluster_installation.id.as_str().to_string();
        insert_new(
            &mut state.cluster_installations,
            "cluster installation",
            id,
            cluster_installation,
        )
    }

    async fn update_cluster_installation(
        &self,
        cluster_installation: &ClusterInstallation,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let existing = state
            .cluster_installations
            .get_mut(cluster_installation.id.as_str())
            .ok_or_else(|| {
                StoreError::not_found("cluster installation", cluster_installation.id.as_str())
            })?;
        let mut updated = cluster_installation.clone();
        updated.create_at = existing.create_at;
        updated.delete_at = existing.delete_at;
        updated.lock_acquired_by = existing.lock_acquired_by.clone();
        updated.lock_acquired_at = existing.lock_acquired_at;
        *existing = updated;
        Ok(())
    }

    async fn update_cluster_installation_state(
        &self,
        id: &ClusterInstallationId,
        new_state: ClusterInstallationState,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let existing = state
            .cluster_installations
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::not_found("cluster installation", id.as_str()))?;
        existing.state = new_state;
        Ok(())
    }

    async fn delete_cluster_installation(
        &self,
        id: &ClusterInstallationId,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state
            .cluster_installations
            .remove(id.as_str())
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("cluster installation", id.as_str()))
    }

    async fn lock_cluster_installation(
        &self,
        id: &ClusterInstallationId,
        locker_id: &str,
    ) -> Result<bool, StoreError> {
        let now = self.now();
        let mut state = self.state.lock();
        Ok(try_lock_row(state.cluster_installations.get_mut(id.as_str()), locker_id, now))
    }

    async fn lock_cluster_installations(
        &self,
        ids: &[ClusterInstallationId],
        locker_id: &str,
    ) -> Result<bool, StoreError> {
        let now = self.now();
        let mut state = self.state.lock();
        // All-or-none: verify every row is free before taking any.
        for id in ids {
            match state.cluster_installations.get(id.as_str()) {
                Some(ci) if !ci.soft_deleted() && ci.lock_holder().is_none() => {}
                _ => return Ok(false),
            }
        }
        for id in ids {
            if let Some(ci) = state.cluster_installations.get_mut(id.as_str()) {
                ci.set_lock(Some(locker_id.to_string()), now);
            }
        }
        Ok(true)
    }

    async fn unlock_cluster_installation(
        &self,
        id: &ClusterInstallationId,
        locker_id: &str,
        force: bool,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        Ok(unlock_row(state.cluster_installations.get_mut(id.as_str()), locker_id, force))
    }

    async fn unlock_cluster_installations(
        &self,
        ids: &[ClusterInstallationId],
        locker_id: &str,
        force: bool,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        for id in ids {
            unlock_row(state.cluster_installations.get_mut(id.as_str()), locker_id, force);
        }
        Ok(())
    }
}

#[async_trait]
impl<C: Clock> GroupStore for MemoryStore<C> {
    async fn get_group(&self, id: &GroupId) -> Result<Option<Group>, StoreError> {
        Ok(self.state.lock().groups.get(id.as_str()).cloned())
    }

    async fn get_unlocked_groups_pending_work(&self) -> Result<Vec<Group>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .groups
            .values()
            .filter(|g| !g.is_deleted() && g.lock_acquired_by.is_none())
            .cloned()
            .collect())
    }

    async fn get_group_rolling_metadata(
        &self,
        id: &GroupId,
    ) -> Result<GroupRollingMetadata, StoreError> {
        let state = self.state.lock();
        let group = state
            .groups
            .get(id.as_str())
            .ok_or_else(|| StoreError::not_found("group", id.as_str()))?;

        let mut metadata = GroupRollingMetadata::default();
        for installation in state.installations.values() {
            if installation.is_deleted() || installation.group_id.as_ref() != Some(id) {
                continue;
            }
            metadata.installations_total += 1;
            match installation.state {
                InstallationState::Stable => {
                    if installation.group_sequence != Some(group.sequence) {
                        metadata.ids_to_be_rolled.push(installation.id.clone());
                    }
                }
                InstallationState::Hibernating => {}
                _ => metadata.installations_rolling += 1,
            }
        }
        Ok(metadata)
    }

    async fn create_group(&self, mut group: Group) -> Result<Group, StoreError> {
        group.create_at = self.now();
        let mut state = self.state.lock();
        let id = group.id.as_str().to_string();
        insert_new(&mut state.groups, "group", id, group)
    }

    async fn lock_group(&self, id: &GroupId, locker_id: &str) -> Result<bool, StoreError> {
        let now = self.now();
        let mut state = self.state.lock();
        Ok(try_lock_row(state.groups.get_mut(id.as_str()), locker_id, now))
    }

    async fn unlock_group(
        &self,
        id: &GroupId,
        locker_id: &str,
        force: bool,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        Ok(unlock_row(state.groups.get_mut(id.as_str()), locker_id, force))
    }
}

#[async_trait]
impl<C: Clock> BackupStore for MemoryStore<C> {
    async fn get_installation_backup(
        &self,
        id: &InstallationBackupId,
    ) -> Result<Option<InstallationBackup>, StoreError> {
        Ok(self.state.lock().backups.get(id.as_str()).cloned())
    }

    async fn get_installation_backups(
        &self,
        filter: &BackupFilter,
    ) -> Result<Vec<InstallationBackup>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .backups
            .values()
            .filter(|b| filter.include_deleted || !b.is_deleted())
            .filter(|b| {
                filter.installation_id.is_none()
                    || Some(&b.installation_id) == filter.installation_id.as_ref()
            })
            .filter(|b| {
                filter.cluster_installation_id.is_none()
                    || b.cluster_installation_id == filter.cluster_installation_id
            })
            .filter(|b| filter.states.is_empty() || filter.states.contains(&b.state))
            .cloned()
            .collect())
    }

    async fn get_unlocked_installation_backups_pending_work(
        &self,
    ) -> Result<Vec<InstallationBackup>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .backups
            .values()
            .filter(|b| !b.is_deleted() && b.state.pending_work() && b.lock_acquired_by.is_none())
            .cloned()
            .collect())
    }

    async fn create_installation_backup(
        &self,
        mut backup: InstallationBackup,
    ) -> Result<InstallationBackup, StoreError> {
        backup.create_at = self.now();
        let mut state = self.state.lock();
        let id = backup.id.as_str().to_string();
        insert_new(&mut state.backups, "backup", id, backup)
    }

    async fn update_installation_backup(
        &self,
        backup: &InstallationBackup,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let existing = state
            .backups
            .get_mut(backup.id.as_str())
            .ok_or_else(|| StoreError::not_found("backup", backup.id.as_str()))?;
        let mut updated = backup.clone();
        updated.create_at = existing.create_at;
        updated.delete_at = existing.delete_at;
        updated.lock_acquired_by = existing.lock_acquired_by.clone();
        updated.lock_acquired_at = existing.lock_acquired_at;
        *existing = updated;
        Ok(())
    }

    async fn update_installation_backup_state(
        &self,
        id: &InstallationBackupId,
        new_state: InstallationBackupState,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let existing = state
            .backups
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::not_found("backup", id.as_str()))?;
        existing.state = new_state;
        Ok(())
    }

    async fn delete_installation_backup(
        &self,
        id: &InstallationBackupId,
    ) -> Result<(), StoreError> {
        let now = self.now();
        let mut state = self.state.lock();
        let existing = state
            .backups
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::not_found("backup", id.as_str()))?;
        if existing.delete_at == 0 {
            existing.delete_at = now;
        }
        Ok(())
    }

    async fn lock_installation_backup(
        &self,
        id: &InstallationBackupId,
        locker_id: &str,
    ) -> Result<bool, StoreError> {
        let now = self.now();
        let mut state = self.state.lock();
        Ok(try_lock_row(state.backups.get_mut(id.as_str()), locker_id, now))
    }

    async fn unlock_installation_backup(
        &self,
        id: &InstallationBackupId,
        locker_id: &str,
        force: bool,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        Ok(unlock_row(state.backups.get_mut(id.as_str()), locker_id, force))
    }
}

#[async_trait]
impl<C: Clock> RestorationStore for MemoryStore<C> {
    async fn get_installation_db_restoration(
        &self,
        id: &InstallationDbRestorationOperationId,
    ) -> Result<Option<InstallationDbRestorationOperation>, StoreError> {
        Ok(self.state.lock().restorations.get(id.as_str()).cloned())
    }

    async fn get_installation_db_restorations(
        &self,
        installation_id: &InstallationId,
    ) -> Result<Vec<InstallationDbRestorationOperation>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .restorations
            .values()
            .filter(|r| !r.is_deleted() && &r.installation_id == installation_id)
            .cloned()
            .collect())
    }

    async fn get_unlocked_installation_db_restorations_pending_work(
        &self,
    ) -> Result<Vec<InstallationDbRestorationOperation>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .restorations
            .values()
            .filter(|r| !r.is_deleted() && r.state.pending_work() && r.lock_acquired_by.is_none())
            .cloned()
            .collect())
    }

    async fn create_installation_db_restoration(
        &self,
        mut restoration: InstallationDbRestorationOperation,
    ) -> Result<InstallationDbRestorationOperation, StoreError> {
        restoration.create_at = self.now();
        let mut state = self.state.lock();
        let id = restoration.id.as_str().to_string();
        insert_new(&mut state.restorations, "restoration", id, restoration)
    }

    async fn update_installation_db_restoration(
        &self,
        restoration: &InstallationDbRestorationOperation,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let existing = state
            .restorations
            .get_mut(restoration.id.as_str())
            .ok_or_else(|| StoreError::not_found("restoration", restoration.id.as_str()))?;
        let mut updated = restoration.clone();
        updated.create_at = existing.create_at;
        updated.delete_at = existing.delete_at;
        updated.lock_acquired_by = existing.lock_acquired_by.clone();
        updated.lock_acquired_at = existing.lock_acquired_at;
        *existing = updated;
        Ok(())
    }

    async fn update_installation_db_restoration_state(
        &self,
        id: &InstallationDbRestorationOperationId,
        new_state: RestorationState,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let existing = state
            .restorations
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::not_found("restoration", id.as_str()))?;
        existing.state = new_state;
        Ok(())
    }

    async fn delete_installation_db_restoration(
        &self,
        id: &InstallationDbRestorationOperationId,
    ) -> Result<(), StoreError> {
        let now = self.now();
        let mut state = self.state.lock();
        let existing = state
            .restorations
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::not_found("restoration", id.as_str()))?;
        if existing.delete_at == 0 {
            existing.delete_at = now;
        }
        Ok(())
    }

    async fn lock_installation_db_restoration(
        &self,
        id: &InstallationDbRestorationOperationId,
        locker_id: &str,
    ) -> Result<bool, StoreError> {
        let now = self.now();
        let mut state = self.state.lock();
        Ok(try_lock_row(state.restorations.get_mut(id.as_str()), locker_id, now))
    }

    async fn unlock_installation_db_restoration(
        &self,
        id: &InstallationDbRestorationOperationId,
        locker_id: &str,
        force: bool,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        Ok(unlock_row(state.restorations.get_mut(id.as_str()), locker_id, force))
    }
}

#[async_trait]
impl<C: Clock> MigrationStore for MemoryStore<C> {
    async fn get_installation_db_migration(
        &self,
        id: &InstallationDbMigrationOperationId,
    ) -> Result<Option<InstallationDbMigrationOperation>, StoreError> {
        Ok(self.state.lock().migrations.get(id.as_str()).cloned())
    }

    async fn get_installation_db_migrations(
        &self,
        installation_id: &InstallationId,
    ) -> Result<Vec<InstallationDbMigrationOperation>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .migrations
            .values()
            .filter(|m| !m.is_deleted() && &m.installation_id == installation_id)
            .cloned()
            .collect())
    }

    async fn get_unlocked_installation_db_migrations_pending_work(
        &self,
    ) -> Result<Vec<InstallationDbMigrationOperation>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .migrations
            .values()
            .filter(|m| !m.is_deleted() && m.state.pending_work() && m.lock_acquired_by.is_none())
            .cloned()
            .collect())
    }

    async fn create_installation_db_migration(
        &self,
        mut migration: InstallationDbMigrationOperation,
    ) -> Result<InstallationDbMigrationOperation, StoreError> {
        migration.create_at = self.now();
        let mut state = self.state.lock();
        let id = migration.id.as_str().to_string();
        insert_new(&mut state.migrations, "migration", id, migration)
    }

    async fn update_installation_db_migration(
        &self,
        migration: &InstallationDbMigrationOperation,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let existing = state
            .migrations
            .get_mut(migration.id.as_str())
            .ok_or_else(|| StoreError::not_found("migration", migration.id.as_str()))?;
        let mut updated = migration.clone();
        updated.create_at = existing.create_at;
        updated.delete_at = existing.delete_at;
        updated.lock_acquired_by = existing.lock_acquired_by.clone();
        updated.lock_acquired_at = existing.lock_acquired_at;
        *existing = updated;
        Ok(())
    }

    async fn update_installation_db_migration_state(
        &self,
        id: &InstallationDbMigrationOperationId,
        new_state: MigrationState,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let existing = state
            .migrations
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::not_found("migration", id.as_str()))?;
        existing.state = new_state;
        Ok(())
    }

    async fn delete_installation_db_migration(
        &self,
        id: &InstallationDbMigrationOperationId,
    ) -> Result<(), StoreError> {
        let now = self.now();
        let mut state = self.state.lock();
        let existing = state
            .migrations
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::not_found("migration", id.as_str()))?;
        if existing.delete_at == 0 {
            existing.delete_at = now;
        }
        Ok(())
    }

    async fn lock_installation_db_migration(
        &self,
        id: &InstallationDbMigrationOperationId,
        locker_id: &str,
    ) -> Result<bool, StoreError> {
        let now = self.now();
        let mut state = self.state.lock();
        Ok(try_lock_row(state.migrations.get_mut(id.as_str()), locker_id, now))
    }

    async fn unlock_installation_db_migration(
        &self,
        id: &InstallationDbMigrationOperationId,
        locker_id: &str,
        force: bool,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        Ok(unlock_row(state.migrations.get_mut(id.as_str()), locker_id, force))
    }
}

#[async_trait]
impl<C: Clock> EventStore for MemoryStore<C> {
    async fn record_state_change(&self, event: StateChangeEvent) -> Result<(), StoreError> {
        self.state.lock().events.push(event);
        Ok(())
    }

    async fn get_latest_state_change(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
        new_state: &str,
    ) -> Result<Option<StateChangeEvent>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .events
            .iter()
            .filter(|e| {
                e.resource_type == resource_type
                    && e.resource_id == resource_id
                    && e.new_state == new_state
            })
            .max_by_key(|e| e.timestamp)
            .cloned())
    }

    async fn get_state_changes(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
    ) -> Result<Vec<StateChangeEvent>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .events
            .iter()
            .filter(|e| e.resource_type == resource_type && e.resource_id == resource_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
