// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster-installation supervisor: one per-cluster child record.
//!
//! Creation applies the workload to the target cluster and polls it to
//! `ready`/`stable`. Deletion refuses to proceed while a backup is running
//! against the row, and hard-deletes it once the provisioner confirms the
//! workload is gone (the terminal state is still recorded in the audit
//! trail first).

use crate::doer::Doer;
use crate::error::EngineError;
use crate::{events, lock};
use async_trait::async_trait;
use gantry_adapters::{EventProducer, Provisioner, ProvisionerRegistry};
use gantry_core::{
    Clock, Cluster, ClusterInstallation, ClusterInstallationState, Installation, ResourceType,
    SystemClock,
};
use gantry_store::{
    BackupFilter, BackupStore, ClusterInstallationStore, ClusterStore, EventStore,
    InstallationStore,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Store surface the cluster-installation supervisor needs.
pub trait ClusterInstallationSupervisorStore:
    ClusterInstallationStore + ClusterStore + InstallationStore + BackupStore + EventStore
{
}

impl<T> ClusterInstallationSupervisorStore for T where
    T: ClusterInstallationStore + ClusterStore + InstallationStore + BackupStore + EventStore
{
}

/// What happened to the supervised row.
enum Outcome {
    Kept(Option<ClusterInstallationState>),
    /// The row was hard-deleted; there is no lock left to release.
    Removed,
}

/// Supervisor for [`ClusterInstallation`] resources.
pub struct ClusterInstallationSupervisor<S, C = SystemClock> {
    store: Arc<S>,
    provisioners: Arc<ProvisionerRegistry>,
    producer: Arc<dyn EventProducer>,
    instance_id: String,
    clock: C,
}

impl<S, C> ClusterInstallationSupervisor<S, C>
where
    S: ClusterInstallationSupervisorStore,
    C: Clock,
{
    pub fn new(
        store: Arc<S>,
        provisioners: Arc<ProvisionerRegistry>,
        producer: Arc<dyn EventProducer>,
        instance_id: impl Into<String>,
        clock: C,
    ) -> Self {
        Self { store, provisioners, producer, instance_id: instance_id.into(), clock }
    }

    /// Advance one cluster installation by at most one state.
    pub async fn supervise(&self, observed: &ClusterInstallation) {
        let id = observed.id.clone();
        if !lock::acquire(
            self.store.lock_cluster_installation(&id, &self.instance_id),
            "cluster-installation",
            id.as_str(),
        )
        .await
        {
            return;
        }
        let outcome = self.supervise_locked(observed).await;
        match outcome {
            Outcome::Removed => {}
            Outcome::Kept(_) => {
                lock::release(
                    self.store.unlock_cluster_installation(&id, &self.instance_id, false),
                    "cluster-installation",
                    id.as_str(),
                )
                .await;
            }
        }
    }

    async fn supervise_locked(&self, observed: &ClusterInstallation) -> Outcome {
        let cluster_installation =
            match self.store.get_cluster_installation(&observed.id).await {
                Ok(Some(ci)) => ci,
                Ok(None) => {
                    debug!(cluster_installation_id = %observed.id, "row gone before supervision");
                    return Outcome::Removed;
                }
                Err(error) => {
                    warn!(cluster_installation_id = %observed.id, %error, "failed to reload row");
                    return Outcome::Kept(None);
                }
            };
        if cluster_installation.state != observed.state {
            debug!(
                cluster_installation_id = %cluster_installation.id,
                observed = observed.state.as_str(),
                current = cluster_installation.state.as_str(),
                "state moved since scan, yielding"
            );
            return Outcome::Kept(None);
        }

        let Some(cluster) = self.cluster_of(&cluster_installation).await else {
            return Outcome::Kept(None);
        };

        let old_state = cluster_installation.state;
        let new_state = match old_state {
            ClusterInstallationState::CreationRequested => {
                self.handle_creation(&cluster, &cluster_installation).await
            }
            ClusterInstallationState::Reconciling => {
                self.handle_reconciling(&cluster, &cluster_installation).await
            }
            ClusterInstallationState::DeletionRequested => {
                match self.handle_deletion(&cluster, &cluster_installation).await {
                    Outcome::Removed => return Outcome::Removed,
                    Outcome::Kept(state) => state.unwrap_or(old_state),
                }
            }
            other => {
                warn!(
                    cluster_installation_id = %cluster_installation.id,
                    state = other.as_str(),
                    "unexpected cluster installation state in supervisor"
                );
                other
            }
        };
        if new_state == old_state {
            return Outcome::Kept(None);
        }

        if let Err(error) = self
            .store
            .update_cluster_installation_state(&cluster_installation.id, new_state)
            .await
        {
            warn!(cluster_installation_id = %cluster_installation.id, %error, "failed to persist new state");
            return Outcome::Kept(None);
        }
        self.commit(&cluster_installation, old_state, new_state).await;
        Outcome::Kept(Some(new_state))
    }

    async fn commit(
        &self,
        cluster_installation: &ClusterInstallation,
        old_state: ClusterInstallationState,
        new_state: ClusterInstallationState,
    ) {
        events::record_transition(
            self.store.as_ref(),
            ResourceType::ClusterInstallation,
            cluster_installation.id.as_str(),
            old_state.as_str(),
            new_state.as_str(),
            self.clock.epoch_ms(),
        )
        .await;
        let mut updated = cluster_installation.clone();
        updated.state = new_state;
        events::notify_cluster_installation(self.producer.as_ref(), &updated, old_state).await;
    }

    async fn handle_creation(
        &self,
        cluster: &Cluster,
        cluster_installation: &ClusterInstallation,
    ) -> ClusterInstallationState {
        let Some((provisioner, installation)) = self.context_for(cluster_installation).await
        else {
            return cluster_installation.state;
        };
        match provisioner
            .create_cluster_installation(cluster, &installation, cluster_installation)
            .await
        {
            Ok(()) => ClusterInstallationState::Reconciling,
            Err(error) if error.is_terminal() => {
                warn!(cluster_installation_id = %cluster_installation.id, %error, "creation failed");
                ClusterInstallationState::CreationFailed
            }
            Err(error) => {
                warn!(cluster_installation_id = %cluster_installation.id, %error, "creation attempt failed");
                cluster_installation.state
            }
        }
    }

    async fn handle_reconciling(
        &self,
        cluster: &Cluster,
        cluster_installation: &ClusterInstallation,
    ) -> ClusterInstallationState {
        let Some((provisioner, _installation)) = self.context_for(cluster_installation).await
        else {
            return cluster_installation.state;
        };
        match provisioner.is_resource_ready_and_stable(cluster, cluster_installation).await {
            Ok(state) if state.stable => ClusterInstallationState::Stable,
            Ok(state) if state.ready => ClusterInstallationState::Ready,
            Ok(_) => {
                debug!(cluster_installation_id = %cluster_installation.id, "workload not ready yet");
                cluster_installation.state
            }
            Err(error) if error.is_terminal() => {
                warn!(cluster_installation_id = %cluster_installation.id, %error, "workload will never settle");
                ClusterInstallationState::CreationFailed
            }
            Err(error) => {
                warn!(cluster_installation_id = %cluster_installation.id, %error, "readiness check failed");
                cluster_installation.state
            }
        }
    }

    async fn handle_deletion(
        &self,
        cluster: &Cluster,
        cluster_installation: &ClusterInstallation,
    ) -> Outcome {
        // A backup still running against this row pins it in place.
        let filter = BackupFilter {
            cluster_installation_id: Some(cluster_installation.id.clone()),
            ..Default::default()
        };
        match self.store.get_installation_backups(&filter).await {
            Ok(backups) => {
                if backups.iter().any(|b| b.state.running()) {
                    debug!(
                        cluster_installation_id = %cluster_installation.id,
                        "backup in progress, deferring deletion"
                    );
                    return Outcome::Kept(None);
                }
            }
            Err(error) => {
                warn!(cluster_installation_id = %cluster_installation.id, %error, "failed to list backups");
                return Outcome::Kept(None);
            }
        }

        let Some((provisioner, _installation)) = self.context_for(cluster_installation).await
        else {
            return Outcome::Kept(None);
        };
        match provisioner.delete_cluster_installation(cluster, cluster_installation).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(cluster_installation_id = %cluster_installation.id, "deletion still in flight");
                return Outcome::Kept(None);
            }
            Err(error) if error.is_terminal() => {
                warn!(cluster_installation_id = %cluster_installation.id, %error, "deletion failed");
                return Outcome::Kept(Some(ClusterInstallationState::DeletionFailed));
            }
            Err(error) => {
                warn!(cluster_installation_id = %cluster_installation.id, %error, "deletion attempt failed");
                return Outcome::Kept(None);
            }
        }

        // Teardown is confirmed; record the terminal state, then remove the
        // row entirely.
        self.commit(
            cluster_installation,
            cluster_installation.state,
            ClusterInstallationState::Deleted,
        )
        .await;
        if let Err(error) =
            self.store.delete_cluster_installation(&cluster_installation.id).await
        {
            warn!(cluster_installation_id = %cluster_installation.id, %error, "failed to remove row");
            return Outcome::Kept(None);
        }
        Outcome::Removed
    }

    /// Look up the provisioner and parent installation for a row.
    async fn context_for(
        &self,
        cluster_installation: &ClusterInstallation,
    ) -> Option<(Arc<dyn Provisioner>, Installation)> {
        let installation =
            match self.store.get_installation(&cluster_installation.installation_id).await {
                Ok(Some(installation)) => installation,
                Ok(None) => {
                    warn!(
                        installation_id = %cluster_installation.installation_id,
                        "parent installation not found"
                    );
                    return None;
                }
                Err(error) => {
                    warn!(
                        installation_id = %cluster_installation.installation_id,
                        %error,
                        "failed to load parent installation"
                    );
                    return None;
                }
            };
        let provisioner = self.provisioners.get(&cluster_installation.cr_version);
        if provisioner.is_none() {
            warn!(
                cluster_installation_id = %cluster_installation.id,
                cr_version = %cluster_installation.cr_version,
                "no provisioner registered for cr version"
            );
        }
        provisioner.map(|p| (p, installation))
    }

    async fn cluster_of(&self, cluster_installation: &ClusterInstallation) -> Option<Cluster> {
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
impl<S, C> Doer for ClusterInstallationSupervisor<S, C>
where
    S: ClusterInstallationSupervisorStore + 'static,
    C: Clock,
{
    async fn run(&self) -> Result<(), EngineError> {
        let work = self.store.get_unlocked_cluster_installations_pending_work().await?;
        for cluster_installation in &work {
            self.supervise(cluster_installation).await;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "cluster-installation-supervisor"
    }
}

#[cfg(test)]
#[path = "cluster_installation_tests.rs"]
mod tests;
