// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Restoration supervisor: rehydrates an installation from a backup.
//!
//! While the restore runs, the installation is parked in
//! `db-restoration-in-progress`. `finalizing` hands the installation back in
//! the operation's `target_installation_state`; `failing` parks it in
//! `db-restoration-failed` before the operation settles as `failed`.

use crate::doer::Doer;
use crate::error::EngineError;
use crate::{events, lock};
use async_trait::async_trait;
use gantry_adapters::RestoreOperator;
use gantry_core::{
    Clock, Cluster, ClusterInstallationState, InstallationBackupState,
    InstallationDbRestorationOperation, InstallationState, ResourceType, RestorationState,
    SystemClock,
};
use gantry_store::{
    BackupStore, ClusterInstallationFilter, ClusterInstallationStore, ClusterStore, EventStore,
    InstallationStore, RestorationStore,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Store surface the restoration supervisor needs.
pub trait RestorationSupervisorStore:
    RestorationStore
    + BackupStore
    + InstallationStore
    + ClusterInstallationStore
    + ClusterStore
    + EventStore
{
}

impl<T> RestorationSupervisorStore for T where
    T: RestorationStore
        + BackupStore
        + InstallationStore
        + ClusterInstallationStore
        + ClusterStore
        + EventStore
{
}

/// Supervisor for [`InstallationDbRestorationOperation`] resources.
pub struct RestorationSupervisor<S, C = SystemClock> {
    store: Arc<S>,
    operator: Arc<dyn RestoreOperator>,
    instance_id: String,
    clock: C,
}

impl<S, C> RestorationSupervisor<S, C>
where
    S: RestorationSupervisorStore,
    C: Clock,
{
    pub fn new(
        store: Arc<S>,
        operator: Arc<dyn RestoreOperator>,
        instance_id: impl Into<String>,
        clock: C,
    ) -> Self {
        Self { store, operator, instance_id: instance_id.into(), clock }
    }

    /// Advance one restoration by at most one state.
    pub async fn supervise(&self, observed: &InstallationDbRestorationOperation) {
        let id = observed.id.clone();
        if !lock::acquire(
            self.store.lock_installation_db_restoration(&id, &self.instance_id),
            "restoration",
            id.as_str(),
        )
        .await
        {
            return;
        }
        self.supervise_locked(observed).await;
        lock::release(
            self.store.unlock_installation_db_restoration(&id, &self.instance_id, false),
            "restoration",
            id.as_str(),
        )
        .await;
    }

    async fn supervise_locked(&self, observed: &InstallationDbRestorationOperation) {
        let restoration = match self.store.get_installation_db_restoration(&observed.id).await {
            Ok(Some(restoration)) => restoration,
            Ok(None) => {
                warn!(restoration_id = %observed.id, "restoration disappeared before supervision");
                return;
            }
            Err(error) => {
                warn!(restoration_id = %observed.id, %error, "failed to reload restoration");
                return;
            }
        };
        if restoration.state != observed.state {
            debug!(
                restoration_id = %restoration.id,
                observed = observed.state.as_str(),
                current = restoration.state.as_str(),
                "state moved since scan, yielding"
            );
            return;
        }

        let old_state = restoration.state;
        let new_state = match old_state {
            RestorationState::Requested => self.handle_requested(&restoration).await,
            RestorationState::InProgress => self.handle_in_progress(&restoration).await,
            RestorationState::Finalizing => self.handle_finalizing(&restoration).await,
            RestorationState::Failing => self.handle_failing(&restoration).await,
            RestorationState::DeletionRequested => self.handle_deletion(&restoration).await,
            other => {
                warn!(restoration_id = %restoration.id, state = other.as_str(), "unexpected restoration state");
                other
            }
        };
        if new_state == old_state {
            return;
        }

        if let Err(error) =
            self.store.update_installation_db_restoration_state(&restoration.id, new_state).await
        {
            warn!(restoration_id = %restoration.id, %error, "failed to persist new state");
            return;
        }
        events::record_transition(
            self.store.as_ref(),
            ResourceType::InstallationDbRestoration,
            restoration.id.as_str(),
            old_state.as_str(),
            new_state.as_str(),
            self.clock.epoch_ms(),
        )
        .await;
    }

    async fn handle_requested(
        &self,
        restoration: &InstallationDbRestorationOperation,
    ) -> RestorationState {
        let installation =
            match self.store.get_installation(&restoration.installation_id).await {
                Ok(Some(installation)) if !installation.is_deleted() => installation,
                Ok(_) => {
                    warn!(restoration_id = %restoration.id, "installation deleted, failing restoration");
                    return RestorationState::Failed;
                }
                Err(error) => {
                    warn!(restoration_id = %restoration.id, %error, "failed to load installation");
                    return restoration.state;
                }
            };

        let backup = match self.store.get_installation_backup(&restoration.backup_id).await {
            Ok(Some(backup)) => backup,
            Ok(None) => {
                warn!(restoration_id = %restoration.id, "backup not found, failing restoration");
                return RestorationState::Failed;
            }
            Err(error) => {
                warn!(restoration_id = %restoration.id, %error, "failed to load backup");
                return restoration.state;
            }
        };
        if backup.state != InstallationBackupState::Succeeded {
            debug!(
                restoration_id = %restoration.id,
                backup_state = backup.state.as_str(),
                "backup not finished, waiting"
            );
            return restoration.state;
        }

        // Pin the restore job to one of the installation's cluster
        // installations.
        let filter = ClusterInstallationFilter {
            installation_id: Some(restoration.installation_id.clone()),
            ..Default::default()
        };
        let children = match self.store.get_cluster_installations(&filter).await {
            Ok(children) => children,
            Err(error) => {
                warn!(restoration_id = %restoration.id, %error, "failed to list cluster installations");
                return restoration.state;
            }
        };
        let Some(child) =
            children.into_iter().find(|c| c.state == ClusterInstallationState::Stable)
        else {
            debug!(restoration_id = %restoration.id, "no stable cluster installation for restore");
            return restoration.state;
        };
        let Some(cluster) = self.cluster(child.cluster_id.as_str()).await else {
            return restoration.state;
        };

        let mut updated = restoration.clone();
        updated.cluster_installation_id = Some(child.id.clone());
        if let Err(error) = self.store.update_installation_db_restoration(&updated).await {
            warn!(restoration_id = %restoration.id, %error, "failed to pin cluster installation");
            return restoration.state;
        }

        // Park the installation while its database is being overwritten.
        if installation.state != InstallationState::DbRestorationInProgress {
            if let Err(error) = self
                .store
                .update_installation_state(
                    &installation.id,
                    InstallationState::DbRestorationInProgress,
                )
                .await
            {
                warn!(installation_id = %installation.id, %error, "failed to park installation");
                return restoration.state;
            }
            events::record_transition(
                self.store.as_ref(),
                ResourceType::Installation,
                installation.id.as_str(),
                installation.state.as_str(),
                InstallationState::DbRestorationInProgress.as_str(),
                self.clock.epoch_ms(),
            )
            .await;
        }

        match self.operator.trigger_restore(&updated, &installation, &backup, &cluster).await {
            Ok(()) => {
                info!(restoration_id = %restoration.id, "restore started");
                RestorationState::InProgress
            }
            Err(error) if error.is_terminal() => {
                warn!(restoration_id = %restoration.id, %error, "restore cannot start");
                RestorationState::Failing
            }
            Err(error) => {
                warn!(restoration_id = %restoration.id, %error, "failed to trigger restore");
                restoration.state
            }
        }
    }

    async fn handle_in_progress(
        &self,
        restoration: &InstallationDbRestorationOperation,
    ) -> RestorationState {
        let Some(cluster) = self.restoration_cluster(restoration).await else {
            return restoration.state;
        };
        match self.operator.check_restore_status(restoration, &cluster).await {
            Ok(Some(complete_at)) => {
                info!(restoration_id = %restoration.id, complete_at, "restore finished");
                RestorationState::Finalizing
            }
            Ok(None) => {
                debug!(restoration_id = %restoration.id, "restore still running");
                restoration.state
            }
            Err(error) if error.is_terminal() => {
                warn!(restoration_id = %restoration.id, %error, "restore job gave up");
                RestorationState::Failing
            }
            Err(error) => {
                warn!(restoration_id = %restoration.id, %error, "restore status check failed");
                restoration.state
            }
        }
    }

    async fn handle_finalizing(
        &self,
        restoration: &InstallationDbRestorationOperation,
    ) -> RestorationState {
        if let Some(cluster) = self.restoration_cluster(restoration).await {
            if let Err(error) = self.operator.cleanup_restore_job(restoration, &cluster).await {
                warn!(restoration_id = %restoration.id, %error, "restore cleanup failed");
                return restoration.state;
            }
        }
        if !self
            .hand_back_installation(restoration, restoration.target_installation_state)
            .await
        {
            return restoration.state;
        }
        RestorationState::Succeeded
    }

    async fn handle_failing(
        &self,
        restoration: &InstallationDbRestorationOperation,
    ) -> RestorationState {
        if !self
            .hand_back_installation(restoration, InstallationState::DbRestorationFailed)
            .await
        {
            return restoration.state;
        }
        RestorationState::Failed
    }

    async fn handle_deletion(
        &self,
        restoration: &InstallationDbRestorationOperation,
    ) -> RestorationState {
        if let Some(cluster) = self.restoration_cluster(restoration).await {
            if let Err(error) = self.operator.cleanup_restore_job(restoration, &cluster).await {
                warn!(restoration_id = %restoration.id, %error, "restore cleanup failed");
                return restoration.state;
            }
        }
        if let Err(error) =
            self.store.delete_installation_db_restoration(&restoration.id).await
        {
            warn!(restoration_id = %restoration.id, %error, "failed to soft-delete restoration");
            return restoration.state;
        }
        RestorationState::Deleted
    }

    /// Move the parked installation to `state`. Returns false on store
    /// failure so the caller retries.
    async fn hand_back_installation(
        &self,
        restoration: &InstallationDbRestorationOperation,
        state: InstallationState,
    ) -> bool {
        let installation =
            match self.store.get_installation(&restoration.installation_id).await {
                Ok(Some(installation)) => installation,
                Ok(None) => {
                    warn!(installation_id = %restoration.installation_id, "installation not found");
                    return true;
                }
                Err(error) => {
                    warn!(installation_id = %restoration.installation_id, %error, "failed to load installation");
                    return false;
                }
            };
        if installation.state == state {
            return true;
        }
        if let Err(error) = self.store.update_installation_state(&installation.id, state).await {
            warn!(installation_id = %installation.id, %error, "failed to hand installation back");
            return false;
        }
        events::record_transition(
            self.store.as_ref(),
            ResourceType::Installation,
            installation.id.as_str(),
            installation.state.as_str(),
            state.as_str(),
            self.clock.epoch_ms(),
        )
        .await;
        true
    }

    /// The cluster the restore job was pinned to.
    async fn restoration_cluster(
        &self,
        restoration: &InstallationDbRestorationOperation,
    ) -> Option<Cluster> {
        let Some(ci_id) = restoration.cluster_installation_id.as_ref() else {
            warn!(restoration_id = %restoration.id, "restoration has no cluster installation recorded");
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
        self.cluster(cluster_installation.cluster_id.as_str()).await
    }

    async fn cluster(&self, cluster_id: &str) -> Option<Cluster> {
        match self.store.get_cluster(&cluster_id.into()).await {
            Ok(Some(cluster)) => Some(cluster),
            Ok(None) => {
                warn!(cluster_id, "cluster not found");
                None
            }
            Err(error) => {
                warn!(cluster_id, %error, "failed to load cluster");
                None
            }
        }
    }
}

#[async_trait]
impl<S, C> Doer for RestorationSupervisor<S, C>
where
    S: RestorationSupervisorStore + 'static,
    C: Clock,
{
    async fn run(&self) -> Result<(), EngineError> {
        let work =
            self.store.get_unlocked_installation_db_restorations_pending_work().await?;
        for restoration in &work {
            self.supervise(restoration).await;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "restoration-supervisor"
    }
}

#[cfg(test)]
#[path = "restoration_tests.rs"]
mod tests;
