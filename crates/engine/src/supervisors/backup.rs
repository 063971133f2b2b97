// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backup supervisor: snapshots a hibernated installation.
//!
//! A backup may only start while its installation is `hibernating` and a
//! `stable` cluster installation exists to run the job on. A backup whose
//! installation was deleted can never run and fails immediately.

use crate::doer::Doer;
use crate::error::EngineError;
use crate::{events, lock};
use async_trait::async_trait;
use gantry_core::{
    Clock, Cluster, ClusterInstallation, ClusterInstallationState, InstallationBackup,
    InstallationBackupState, InstallationState, ResourceType, SystemClock,
};
use gantry_store::{
    BackupStore, ClusterInstallationFilter, ClusterInstallationStore, ClusterStore, EventStore,
    InstallationStore,
};
use gantry_adapters::BackupOperator;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Store surface the backup supervisor needs.
pub trait BackupSupervisorStore:
    BackupStore + InstallationStore + ClusterInstallationStore + ClusterStore + EventStore
{
}

impl<T> BackupSupervisorStore for T where
    T: BackupStore + InstallationStore + ClusterInstallationStore + ClusterStore + EventStore
{
}

/// Supervisor for [`InstallationBackup`] resources.
pub struct BackupSupervisor<S, C = SystemClock> {
    store: Arc<S>,
    operator: Arc<dyn BackupOperator>,
    instance_id: String,
    clock: C,
}

impl<S, C> BackupSupervisor<S, C>
where
    S: BackupSupervisorStore,
    C: Clock,
{
    pub fn new(
        store: Arc<S>,
        operator: Arc<dyn BackupOperator>,
        instance_id: impl Into<String>,
        clock: C,
    ) -> Self {
        Self { store, operator, instance_id: instance_id.into(), clock }
    }

    /// Advance one backup by at most one state.
    pub async fn supervise(&self, observed: &InstallationBackup) {
        let id = observed.id.clone();
        if !lock::acquire(
            self.store.lock_installation_backup(&id, &self.instance_id),
            "backup",
            id.as_str(),
        )
        .await
        {
            return;
        }
        self.supervise_locked(observed).await;
        lock::release(
            self.store.unlock_installation_backup(&id, &self.instance_id, false),
            "backup",
            id.as_str(),
        )
        .await;
    }

    async fn supervise_locked(&self, observed: &InstallationBackup) {
        let backup = match self.store.get_installation_backup(&observed.id).await {
            Ok(Some(backup)) => backup,
            Ok(None) => {
                warn!(backup_id = %observed.id, "backup disappeared before supervision");
                return;
            }
            Err(error) => {
                warn!(backup_id = %observed.id, %error, "failed to reload backup");
                return;
            }
        };
        if backup.state != observed.state {
            debug!(
                backup_id = %backup.id,
                observed = observed.state.as_str(),
                current = backup.state.as_str(),
                "state moved since scan, yielding"
            );
            return;
        }

        let old_state = backup.state;
        let new_state = match old_state {
            InstallationBackupState::Requested => self.handle_requested(&backup).await,
            InstallationBackupState::InProgress => self.handle_in_progress(&backup).await,
            InstallationBackupState::DeletionRequested => self.handle_deletion(&backup).await,
            other => {
                warn!(backup_id = %backup.id, state = other.as_str(), "unexpected backup state");
                other
            }
        };
        if new_state == old_state {
            return;
        }

        if let Err(error) =
            self.store.update_installation_backup_state(&backup.id, new_state).await
        {
            warn!(backup_id = %backup.id, %error, "failed to persist new state");
            return;
        }
        events::record_transition(
            self.store.as_ref(),
            ResourceType::InstallationBackup,
            backup.id.as_str(),
            old_state.as_str(),
            new_state.as_str(),
            self.clock.epoch_ms(),
        )
        .await;
    }

    async fn handle_requested(&self, backup: &InstallationBackup) -> InstallationBackupState {
        let installation = match self.store.get_installation(&backup.installation_id).await {
            Ok(Some(installation)) if !installation.is_deleted() => installation,
            Ok(_) => {
                warn!(backup_id = %backup.id, "installation deleted, failing backup");
                return InstallationBackupState::Failed;
            }
            Err(error) => {
                warn!(backup_id = %backup.id, %error, "failed to load installation");
                return backup.state;
            }
        };
        // Hibernated installations only; a migration's backup leg runs while
        // the installation is parked in db-migration-in-progress.
        if !matches!(
            installation.state,
            InstallationState::Hibernating | InstallationState::DbMigrationInProgress
        ) {
            warn!(
                backup_id = %backup.id,
                installation_state = installation.state.as_str(),
                "installation not hibernated, backup cannot start"
            );
            return backup.state;
        }

        let Some((cluster_installation, cluster)) =
            self.stable_cluster_installation(backup).await
        else {
            return backup.state;
        };

        let residence =
            match self.operator.trigger_backup(backup, &installation, &cluster).await {
                Ok(residence) => residence,
                Err(error) if error.is_terminal() => {
                    warn!(backup_id = %backup.id, %error, "backup job cannot start");
                    return InstallationBackupState::Failed;
                }
                Err(error) => {
                    warn!(backup_id = %backup.id, %error, "failed to trigger backup");
                    return backup.state;
                }
            };

        let mut updated = backup.clone();
        updated.cluster_installation_id = Some(cluster_installation.id.clone());
        updated.data_residence = Some(residence);
        if let Err(error) = self.store.update_installation_backup(&updated).await {
            warn!(backup_id = %backup.id, %error, "failed to record backup residence");
            return backup.state;
        }
        info!(backup_id = %backup.id, cluster_id = %cluster.id, "backup started");
        InstallationBackupState::InProgress
    }

    async fn handle_in_progress(&self, backup: &InstallationBackup) -> InstallationBackupState {
        let Some(cluster) = self.backup_cluster(backup).await else {
            return backup.state;
        };
        match self.operator.check_backup_status(backup, &cluster).await {
            Ok(Some(start_at)) => {
                let mut updated = backup.clone();
                updated.start_at = start_at;
                if let Err(error) = self.store.update_installation_backup(&updated).await {
                    warn!(backup_id = %backup.id, %error, "failed to record start time");
                    return backup.state;
                }
                info!(backup_id = %backup.id, start_at, "backup succeeded");
                InstallationBackupState::Succeeded
            }
            Ok(None) => {
                debug!(backup_id = %backup.id, "backup still running");
                backup.state
            }
            Err(error) if error.is_terminal() => {
                warn!(backup_id = %backup.id, %error, "backup job gave up");
                InstallationBackupState::Failed
            }
            Err(error) => {
                warn!(backup_id = %backup.id, %error, "backup status check failed");
                backup.state
            }
        }
    }

    async fn handle_deletion(&self, backup: &InstallationBackup) -> InstallationBackupState {
        let cluster = self.backup_cluster(backup).await;
        if let Err(error) = self.operator.cleanup_backup(backup, cluster.as_ref()).await {
            warn!(backup_id = %backup.id, %error, "backup cleanup failed");
            return backup.state;
        }
        if let Err(error) = self.store.delete_installation_backup(&backup.id).await {
            warn!(backup_id = %backup.id, %error, "failed to soft-delete backup");
            return backup.state;
        }
        InstallationBackupState::Deleted
    }

    /// The stable cluster installation a new backup job runs against.
    async fn stable_cluster_installation(
        &self,
        backup: &InstallationBackup,
    ) -> Option<(ClusterInstallation, Cluster)> {
        let filter = ClusterInstallationFilter {
            installation_id: Some(backup.installation_id.clone()),
            ..Default::default()
        };
        let children = match self.store.get_cluster_installations(&filter).await {
            Ok(children) => children,
            Err(error) => {
                warn!(backup_id = %backup.id, %error, "failed to list cluster installations");
                return None;
            }
        };
        let Some(child) =
            children.into_iter().find(|c| c.state == ClusterInstallationState::Stable)
        else {
            debug!(backup_id = %backup.id, "no stable cluster installation to back up from");
            return None;
        };
        let cluster = match self.store.get_cluster(&child.cluster_id).await {
            Ok(Some(cluster)) => cluster,
            Ok(None) => {
                warn!(cluster_id = %child.cluster_id, "cluster not found");
                return None;
            }
            Err(error) => {
                warn!(cluster_id = %child.cluster_id, %error, "failed to load cluster");
                return None;
            }
        };
        Some((child, cluster))
    }

    /// The cluster a started backup's job lives on, via its recorded
    /// cluster installation.
    async fn backup_cluster(&self, backup: &InstallationBackup) -> Option<Cluster> {
        let Some(ci_id) = backup.cluster_installation_id.as_ref() else {
            warn!(backup_id = %backup.id, "backup has no cluster installation recorded");
            return None;
        };
        let cluster_installation = match self.store.get_cluster_installation(ci_id).await {
            Ok(Some(ci)) => ci,
            Ok(None) => {
                warn!(cluster_installation_id = %ci_id, "cluster installation not found");
                return None;
            }
            Err(error) => {
                warn!(cluster_installation_id = %ci_id, %error, "failed to load cluster installation");
                return None;
            }
        };
        match self.store.get_cluster(&cluster_installation.cluster_id).await {
            Ok(Some(cluster)) => Some(cluster),
            Ok(None) => {
                warn!(cluster_id = %cluster_installation.cluster_id, "cluster not found");
                None
            }
            Err(error) => {
                warn!(cluster_id = %cluster_installation.cluster_id, %error, "failed to load cluster");
                None
            }
        }
    }
}

#[async_trait]
impl<S, C> Doer for BackupSupervisor<S, C>
where
    S: BackupSupervisorStore + 'static,
    C: Clock,
{
    async fn run(&self) -> Result<(), EngineError> {
        let work = self.store.get_unlocked_installation_backups_pending_work().await?;
        for backup in &work {
            self.supervise(backup).await;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "backup-supervisor"
    }
}

#[cfg(test)]
#[path = "backup_tests.rs"]
mod tests;
