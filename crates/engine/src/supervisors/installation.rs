// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Installation supervisor: placement and lifecycle of a tenant app.
//!
//! The scan preserves a fixed priority order so installations mid-creation
//! finish before new work starts: `creation-requested` →
//! `creation-no-compatible-clusters` → `creation-pre-provisioning` →
//! `creation-in-progress` → `creation-dns`, then everything else.

use crate::doer::Doer;
use crate::error::EngineError;
use crate::options::{InstallationSupervisorOptions, SchedulingOptions};
use crate::placement;
use crate::{events, lock};
use async_trait::async_trait;
use gantry_adapters::{CloudClient, EventProducer, Provisioner, ProvisionerRegistry};
use gantry_core::{
    Clock, Cluster, ClusterInstallation, ClusterInstallationId, ClusterInstallationState,
    Installation, InstallationBackupState, InstallationState, ResourceType, RestorationState,
    SystemClock,
};
use gantry_store::{
    BackupFilter, BackupStore, ClusterInstallationFilter, ClusterInstallationStore, ClusterStore,
    EventStore, GroupStore, InstallationStore, MigrationStore, RestorationStore, StoreError,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Store surface the installation supervisor needs.
pub trait InstallationSupervisorStore:
    InstallationStore
    + ClusterStore
    + ClusterInstallationStore
    + GroupStore
    + BackupStore
    + RestorationStore
    + MigrationStore
    + EventStore
{
}

impl<T> InstallationSupervisorStore for T where
    T: InstallationStore
        + ClusterStore
        + ClusterInstallationStore
        + GroupStore
        + BackupStore
        + RestorationStore
        + MigrationStore
        + EventStore
{
}

/// How `reconcile_children` should drive each cluster installation.
enum ChildUpdate {
    /// Re-apply the installation's full desired spec.
    ApplySpec { cleanup_old_licenses: bool },
    /// Scale the workload to zero, keeping its data.
    Hibernate,
}

/// Supervisor for [`Installation`] resources.
pub struct InstallationSupervisor<S, C = SystemClock> {
    store: Arc<S>,
    provisioners: Arc<ProvisionerRegistry>,
    cloud: Arc<dyn CloudClient>,
    producer: Arc<dyn EventProducer>,
    instance_id: String,
    scheduling: SchedulingOptions,
    options: InstallationSupervisorOptions,
    clock: C,
}

/// Scan order: the creation pipeline first, everything else after.
fn scan_priority(state: InstallationState) -> usize {
    match state {
        InstallationState::CreationRequested => 0,
        InstallationState::CreationNoCompatibleClusters => 1,
        InstallationState::CreationPreProvisioning => 2,
        InstallationState::CreationInProgress => 3,
        InstallationState::CreationDns => 4,
        _ => 5,
    }
}

impl<S, C> InstallationSupervisor<S, C>
where
    S: InstallationSupervisorStore,
    C: Clock,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<S>,
        provisioners: Arc<ProvisionerRegistry>,
        cloud: Arc<dyn CloudClient>,
        producer: Arc<dyn EventProducer>,
        instance_id: impl Into<String>,
        scheduling: SchedulingOptions,
        options: InstallationSupervisorOptions,
        clock: C,
    ) -> Self {
        Self {
            store,
            provisioners,
            cloud,
            producer,
            instance_id: instance_id.into(),
            scheduling,
            options,
            clock,
        }
    }

    /// Advance one installation by at most one state.
    ///
    /// `observed` is the row as seen by the scan; if the stored state moved
    /// in the meantime another provisioner is responsible and the cycle
    /// yields without writing.
    pub async fn supervise(&self, observed: &Installation) {
        let id = observed.id.clone();
        if !lock::acquire(
            self.store.lock_installation(&id, &self.instance_id),
            "installation",
            id.as_str(),
        )
        .await
        {
            return;
        }
        self.supervise_locked(observed).await;
        lock::release(
            self.store.unlock_installation(&id, &self.instance_id, false),
            "installation",
            id.as_str(),
        )
        .await;
    }

    async fn supervise_locked(&self, observed: &Installation) {
        let installation = match self.store.get_installation(&observed.id).await {
            Ok(Some(installation)) => installation,
            Ok(None) => {
                warn!(installation_id = %observed.id, "installation disappeared before supervision");
                return;
            }
            Err(error) => {
                warn!(installation_id = %observed.id, %error, "failed to reload installation");
                return;
            }
        };
        if installation.state != observed.state {
            debug!(
                installation_id = %installation.id,
                observed = observed.state.as_str(),
                current = installation.state.as_str(),
                "state moved since scan, yielding"
            );
            return;
        }

        let old_state = installation.state;
        let new_state = self.transition(&installation).await;
        if new_state == old_state {
            return;
        }

        // The transition ran side effects; reload to make sure nothing else
        // moved the row inside that window before persisting.
        let current = match self.store.get_installation(&installation.id).await {
            Ok(Some(current)) => current,
            Ok(None) => {
                warn!(installation_id = %installation.id, "installation disappeared during supervision");
                return;
            }
            Err(error) => {
                warn!(installation_id = %installation.id, %error, "failed to reload installation");
                return;
            }
        };
        if current.state != old_state {
            warn!(
                installation_id = %installation.id,
                expected = old_state.as_str(),
                found = current.state.as_str(),
                "installation changed during supervision, discarding transition"
            );
            return;
        }

        if let Err(error) =
            self.store.update_installation_state(&installation.id, new_state).await
        {
            warn!(installation_id = %installation.id, %error, "failed to persist new state");
            return;
        }
        events::record_transition(
            self.store.as_ref(),
            ResourceType::Installation,
            installation.id.as_str(),
            old_state.as_str(),
            new_state.as_str(),
            self.clock.epoch_ms(),
        )
        .await;
        let mut updated = current;
        updated.state = new_state;
        events::notify_installation(self.producer.as_ref(), &updated, old_state).await;
    }

    /// Dispatch on the current state. Transient failures return the same
    /// state so the next cycle retries; terminal failures return the mapped
    /// failed state.
    async fn transition(&self, installation: &Installation) -> InstallationState {
        match installation.state {
            InstallationState::CreationRequested
            | InstallationState::CreationNoCompatibleClusters => {
                self.handle_creation_requested(installation).await
            }
            InstallationState::CreationPreProvisioning => {
                self.handle_creation_pre_provisioning(installation).await
            }
            InstallationState::CreationInProgress => {
                self.handle_creation_in_progress(installation).await
            }
            InstallationState::CreationDns => self.handle_creation_dns(installation).await,
            InstallationState::CreationFinalTasks => {
                self.handle_creation_final_tasks(installation).await
            }
            InstallationState::UpdateRequested => self.handle_update_requested(installation).await,
            InstallationState::UpdateInProgress => {
                self.handle_update_in_progress(installation).await
            }
            InstallationState::HibernationRequested => {
                self.handle_children_teardown_prep(installation, InstallationState::HibernationInProgress)
                    .await
            }
            InstallationState::HibernationInProgress => {
                self.handle_wait_children_stable(installation, InstallationState::Hibernating).await
            }
            InstallationState::WakeUpRequested
            | InstallationState::DeletionCancellationRequested => {
                self.handle_restore_spec(installation).await
            }
            InstallationState::DeletionPendingRequested => {
                self.handle_children_teardown_prep(
                    installation,
                    InstallationState::DeletionPendingInProgress,
                )
                .await
            }
            InstallationState::DeletionPendingInProgress => {
                self.handle_wait_children_stable(installation, InstallationState::DeletionPending)
                    .await
            }
            InstallationState::DeletionRequested => {
                self.handle_deletion_requested(installation).await
            }
            InstallationState::DeletionInProgress => {
                self.handle_deletion_in_progress(installation).await
            }
            InstallationState::DeletionFinalCleanup => {
                self.handle_deletion_final_cleanup(installation).await
            }
            other => {
                warn!(
                    installation_id = %installation.id,
                    state = other.as_str(),
                    "unexpected installation state in supervisor"
                );
                other
            }
        }
    }

    async fn handle_creation_requested(&self, installation: &Installation) -> InstallationState {
        // Idempotent across crashes: children created by an earlier attempt
        // are adopted instead of re-created.
        let children = match self.children(installation).await {
            Ok(children) => children,
            Err(error) => {
                warn!(installation_id = %installation.id, %error, "failed to list children");
                return installation.state;
            }
        };
        if !children.is_empty() {
            return InstallationState::CreationPreProvisioning;
        }

        let Some(provisioner) = self.provisioner_for(installation) else {
            return installation.state;
        };

        let selected = placement::select_cluster_for_installation(
            self.store.as_ref(),
            provisioner.as_ref(),
            self.producer.as_ref(),
            &self.scheduling,
            self.clock.epoch_ms(),
            installation,
        )
        .await;
        let cluster = match selected {
            Ok(Some(cluster)) => cluster,
            Ok(None) => {
                info!(installation_id = %installation.id, "no compatible clusters");
                return InstallationState::CreationNoCompatibleClusters;
            }
            Err(error) => {
                warn!(installation_id = %installation.id, %error, "placement failed");
                return installation.state;
            }
        };

        if let Err(error) = provisioner.prepare_cluster_utilities(&cluster, installation).await {
            warn!(cluster_id = %cluster.id, %error, "failed to prepare cluster utilities");
            return installation.state;
        }

        let cluster_installation = ClusterInstallation {
            id: ClusterInstallationId::new(),
            cluster_id: cluster.id.clone(),
            installation_id: installation.id.clone(),
            namespace: installation.id.as_str().to_string(),
            cr_version: installation.cr_version.clone(),
            state: ClusterInstallationState::CreationRequested,
            create_at: 0,
            delete_at: 0,
            lock_acquired_by: None,
            lock_acquired_at: 0,
        };
        if let Err(error) = self.store.create_cluster_installation(cluster_installation).await {
            warn!(installation_id = %installation.id, %error, "failed to create cluster installation");
            return installation.state;
        }
        info!(
            installation_id = %installation.id,
            cluster_id = %cluster.id,
            "installation scheduled onto cluster"
        );
        InstallationState::CreationPreProvisioning
    }

    async fn handle_creation_pre_provisioning(
        &self,
        installation: &Installation,
    ) -> InstallationState {
        let children = match self.children(installation).await {
            Ok(children) => children,
            Err(error) => {
                warn!(installation_id = %installation.id, %error, "failed to list children");
                return installation.state;
            }
        };
        if children.is_empty() {
            warn!(installation_id = %installation.id, "no children during pre-provisioning");
            return installation.state;
        }
        if children.iter().any(|c| c.state == ClusterInstallationState::CreationFailed) {
            return InstallationState::CreationFailed;
        }
        if children.iter().all(|c| c.state != ClusterInstallationState::CreationRequested) {
            return InstallationState::CreationInProgress;
        }
        installation.state
    }

    async fn handle_creation_in_progress(&self, installation: &Installation) -> InstallationState {
        let children = match self.children(installation).await {
            Ok(children) => children,
            Err(error) => {
                warn!(installation_id = %installation.id, %error, "failed to list children");
                return installation.state;
            }
        };
        if children.iter().any(|c| c.state == ClusterInstallationState::CreationFailed) {
            return InstallationState::CreationFailed;
        }
        if !children.is_empty()
            && children.iter().all(|c| c.state == ClusterInstallationState::Stable)
        {
            return InstallationState::CreationDns;
        }
        installation.state
    }

    async fn handle_creation_dns(&self, installation: &Installation) -> InstallationState {
        let Some(provisioner) = self.provisioner_for(installation) else {
            return installation.state;
        };
        let children = match self.children(installation).await {
            Ok(children) => children,
            Err(error) => {
                warn!(installation_id = %installation.id, %error, "failed to list children");
                return installation.state;
            }
        };
        if children.is_empty() {
            warn!(installation_id = %installation.id, "no children during dns creation");
            return installation.state;
        }
        for child in &children {
            let Some(cluster) = self.cluster_of(child).await else {
                return installation.state;
            };
            let endpoint = match provisioner.get_public_load_balancer_endpoint(&cluster).await {
                Ok(endpoint) => endpoint,
                Err(error) if error.is_terminal() => {
                    warn!(cluster_id = %cluster.id, %error, "no load balancer for installation");
                    return InstallationState::CreationFailed;
                }
                Err(error) => {
                    warn!(cluster_id = %cluster.id, %error, "failed to read load balancer endpoint");
                    return installation.state;
                }
            };
            if let Err(error) = self.cloud.upsert_public_dns(installation, &endpoint).await {
                warn!(installation_id = %installation.id, %error, "failed to upsert dns");
                return installation.state;
            }
        }
        InstallationState::CreationFinalTasks
    }

    async fn handle_creation_final_tasks(&self, installation: &Installation) -> InstallationState {
        // The workload publishes the tenant admin credentials as a cloud
        // secret; creation is only finished once they exist.
        let secret_name = format!("{}-admin", installation.id);
        match self.cloud.fetch_secret(&secret_name).await {
            Ok(Some(_)) => InstallationState::Stable,
            Ok(None) => {
                debug!(installation_id = %installation.id, "waiting for admin secret");
                installation.state
            }
            Err(error) => {
                warn!(installation_id = %installation.id, %error, "failed to fetch admin secret");
                installation.state
            }
        }
    }

    async fn handle_update_requested(&self, installation: &Installation) -> InstallationState {
        let mut desired = installation.clone();
        if let Some(group_id) = desired.group_id.clone() {
            match self.store.get_group(&group_id).await {
                Ok(Some(group)) => {
                    if !desired.up_to_date_with(&group) {
                        desired.merge_group_config(&group);
                        if let Err(error) = self.store.update_installation(&desired).await {
                            warn!(installation_id = %desired.id, %error, "failed to merge group config");
                            return installation.state;
                        }
                        info!(
                            installation_id = %desired.id,
                            group_id = %group_id,
                            sequence = group.sequence,
                            "merged group configuration"
                        );
                    }
                }
                Ok(None) => {
                    warn!(installation_id = %desired.id, group_id = %group_id, "group not found");
                }
                Err(error) => {
                    warn!(installation_id = %desired.id, %error, "failed to load group");
                    return installation.state;
                }
            }
        }
        if self
            .reconcile_children(&desired, &ChildUpdate::ApplySpec { cleanup_old_licenses: true })
            .await
        {
            InstallationState::UpdateInProgress
        } else {
            installation.state
        }
    }

    async fn handle_update_in_progress(&self, installation: &Installation) -> InstallationState {
        let children = match self.children(installation).await {
            Ok(children) => children,
            Err(error) => {
                warn!(installation_id = %installation.id, %error, "failed to list children");
                return installation.state;
            }
        };
        if children.is_empty()
            || children.iter().any(|c| c.state != ClusterInstallationState::Stable)
        {
            return installation.state;
        }
        let Some(provisioner) = self.provisioner_for(installation) else {
            return installation.state;
        };
        for child in &children {
            let Some(cluster) = self.cluster_of(child).await else {
                return installation.state;
            };
            match provisioner.verify_matches_config(&cluster, installation, child).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(cluster_installation_id = %child.id, "resource does not match config yet");
                    return installation.state;
                }
                Err(error) => {
                    warn!(cluster_installation_id = %child.id, %error, "config verification failed");
                    return installation.state;
                }
            }
        }
        InstallationState::Stable
    }

    /// Shared handler for hibernation-like teardown prep: scale children to
    /// zero and wait for them in the follow-up state.
    async fn handle_children_teardown_prep(
        &self,
        installation: &Installation,
        next: InstallationState,
    ) -> InstallationState {
        if self.reconcile_children(installation, &ChildUpdate::Hibernate).await {
            next
        } else {
            installation.state
        }
    }

    /// Shared handler for the in-progress states that only wait for every
    /// child to settle.
    async fn handle_wait_children_stable(
        &self,
        installation: &Installation,
        next: InstallationState,
    ) -> InstallationState {
        let children = match self.children(installation).await {
            Ok(children) => children,
            Err(error) => {
                warn!(installation_id = %installation.id, %error, "failed to list children");
                return installation.state;
            }
        };
        if !children.is_empty()
            && children.iter().all(|c| c.state == ClusterInstallationState::Stable)
        {
            return next;
        }
        installation.state
    }

    /// Wake-up and deletion-cancellation both re-apply the full desired
    /// spec and ride the ordinary update pipeline back to `stable`.
    async fn handle_restore_spec(&self, installation: &Installation) -> InstallationState {
        if self
            .reconcile_children(installation, &ChildUpdate::ApplySpec { cleanup_old_licenses: false })
            .await
        {
            InstallationState::UpdateInProgress
        } else {
            installation.state
        }
    }

    async fn handle_deletion_requested(&self, installation: &Installation) -> InstallationState {
        // Dependent records are marked for deletion before the children
        // start tearing down.
        if !self.enqueue_dependent_deletions(installation).await {
            return installation.state;
        }

        let children = match self.children(installation).await {
            Ok(children) => children,
            Err(error) => {
                warn!(installation_id = %installation.id, %error, "failed to list children");
                return installation.state;
            }
        };
        if !children.is_empty() {
            let ids: Vec<ClusterInstallationId> =
                children.iter().map(|c| c.id.clone()).collect();
            if !lock::acquire(
                self.store.lock_cluster_installations(&ids, &self.instance_id),
                "cluster-installations",
                installation.id.as_str(),
            )
            .await
            {
                return installation.state;
            }
            let marked = self.mark_children_deletion_requested(&children).await;
            if let Err(error) = self
                .store
                .unlock_cluster_installations(&ids, &self.instance_id, false)
                .await
            {
                warn!(installation_id = %installation.id, %error, "failed to unlock children");
            }
            if !marked {
                return installation.state;
            }
        }
        InstallationState::DeletionInProgress
    }

    async fn mark_children_deletion_requested(&self, children: &[ClusterInstallation]) -> bool {
        for child in children {
            if matches!(
                child.state,
                ClusterInstallationState::DeletionRequested | ClusterInstallationState::Deleted
            ) {
                continue;
            }
            if let Err(error) = self
                .store
                .update_cluster_installation_state(
                    &child.id,
                    ClusterInstallationState::DeletionRequested,
                )
                .await
            {
                warn!(cluster_installation_id = %child.id, %error, "failed to mark child for deletion");
                return false;
            }
            events::record_transition(
                self.store.as_ref(),
                ResourceType::ClusterInstallation,
                child.id.as_str(),
                child.state.as_str(),
                ClusterInstallationState::DeletionRequested.as_str(),
                self.clock.epoch_ms(),
            )
            .await;
            let mut updated = child.clone();
            updated.state = ClusterInstallationState::DeletionRequested;
            events::notify_cluster_installation(self.producer.as_ref(), &updated, child.state)
                .await;
        }
        true
    }

    /// Mark every dependent backup and restoration `deletion-requested` and
    /// soft-delete migration records. Returns false on the first store
    /// failure so the whole step retries next cycle.
    async fn enqueue_dependent_deletions(&self, installation: &Installation) -> bool {
        let filter = BackupFilter {
            installation_id: Some(installation.id.clone()),
            ..Default::default()
        };
        let backups = match self.store.get_installation_backups(&filter).await {
            Ok(backups) => backups,
            Err(error) => {
                warn!(installation_id = %installation.id, %error, "failed to list backups");
                return false;
            }
        };
        for backup in backups {
            if matches!(
                backup.state,
                InstallationBackupState::DeletionRequested | InstallationBackupState::Deleted
            ) {
                continue;
            }
            if let Err(error) = self
                .store
                .update_installation_backup_state(
                    &backup.id,
                    InstallationBackupState::DeletionRequested,
                )
                .await
            {
                warn!(backup_id = %backup.id, %error, "failed to mark backup for deletion");
                return false;
            }
            events::record_transition(
                self.store.as_ref(),
                ResourceType::InstallationBackup,
                backup.id.as_str(),
                backup.state.as_str(),
                InstallationBackupState::DeletionRequested.as_str(),
                self.clock.epoch_ms(),
            )
            .await;
        }

        let restorations =
            match self.store.get_installation_db_restorations(&installation.id).await {
                Ok(restorations) => restorations,
                Err(error) => {
                    warn!(installation_id = %installation.id, %error, "failed to list restorations");
                    return false;
                }
            };
        for restoration in restorations {
            if matches!(
                restoration.state,
                RestorationState::DeletionRequested | RestorationState::Deleted
            ) {
                continue;
            }
            if let Err(error) = self
                .store
                .update_installation_db_restoration_state(
                    &restoration.id,
                    RestorationState::DeletionRequested,
                )
                .await
            {
                warn!(restoration_id = %restoration.id, %error, "failed to mark restoration for deletion");
                return false;
            }
            events::record_transition(
                self.store.as_ref(),
                ResourceType::InstallationDbRestoration,
                restoration.id.as_str(),
                restoration.state.as_str(),
                RestorationState::DeletionRequested.as_str(),
                self.clock.epoch_ms(),
            )
            .await;
        }

        let migrations = match self.store.get_installation_db_migrations(&installation.id).await {
            Ok(migrations) => migrations,
            Err(error) => {
                warn!(installation_id = %installation.id, %error, "failed to list migrations");
                return false;
            }
        };
        for migration in migrations {
            if let Err(error) =
                self.store.delete_installation_db_migration(&migration.id).await
            {
                warn!(migration_id = %migration.id, %error, "failed to delete migration record");
                return false;
            }
        }
        true
    }

    async fn handle_deletion_in_progress(&self, installation: &Installation) -> InstallationState {
        let children = match self.children(installation).await {
            Ok(children) => children,
            Err(error) => {
                warn!(installation_id = %installation.id, %error, "failed to list children");
                return installation.state;
            }
        };
        if children.iter().any(|c| c.state == ClusterInstallationState::DeletionFailed) {
            return InstallationState::DeletionFailed;
        }
        // Rows are hard-deleted once the provisioner confirms teardown, so
        // any surviving row is still in flight.
        if !children.is_empty() {
            return installation.state;
        }

        // Dependent backups and restorations soft-delete when their cleanup
        // finishes; a failed dependent deletion keeps the installation here.
        let filter = BackupFilter {
            installation_id: Some(installation.id.clone()),
            ..Default::default()
        };
        match self.store.get_installation_backups(&filter).await {
            Ok(backups) if !backups.is_empty() => return installation.state,
            Ok(_) => {}
            Err(error) => {
                warn!(installation_id = %installation.id, %error, "failed to list backups");
                return installation.state;
            }
        }
        match self.store.get_installation_db_restorations(&installation.id).await {
            Ok(restorations) if !restorations.is_empty() => return installation.state,
            Ok(_) => {}
            Err(error) => {
                warn!(installation_id = %installation.id, %error, "failed to list restorations");
                return installation.state;
            }
        }
        InstallationState::DeletionFinalCleanup
    }

    async fn handle_deletion_final_cleanup(
        &self,
        installation: &Installation,
    ) -> InstallationState {
        if let Err(error) = self.cloud.delete_public_dns(installation).await {
            warn!(installation_id = %installation.id, %error, "failed to delete dns");
            return installation.state;
        }
        if !self.options.keep_database_data {
            if let Err(error) = self.cloud.delete_installation_database(installation).await {
                warn!(installation_id = %installation.id, %error, "failed to delete database data");
                return installation.state;
            }
        }
        if !self.options.keep_filestore_data {
            if let Err(error) = self.cloud.delete_installation_filestore(installation).await {
                warn!(installation_id = %installation.id, %error, "failed to delete filestore data");
                return installation.state;
            }
        }
        if let Err(error) = self.cloud.release_resource_tags(installation).await {
            warn!(installation_id = %installation.id, %error, "failed to release resource tags");
            return installation.state;
        }
        if let Err(error) = self.store.delete_installation(&installation.id).await {
            warn!(installation_id = %installation.id, %error, "failed to soft-delete installation");
            return installation.state;
        }
        info!(installation_id = %installation.id, "installation deleted");
        InstallationState::Deleted
    }

    /// Lock all children, drive each with `update`, and mark them
    /// `reconciling`. Returns true only when every child was driven.
    async fn reconcile_children(&self, installation: &Installation, update: &ChildUpdate) -> bool {
        let children = match self.children(installation).await {
            Ok(children) => children,
            Err(error) => {
                warn!(installation_id = %installation.id, %error, "failed to list children");
                return false;
            }
        };
        if children.is_empty() {
            warn!(installation_id = %installation.id, "installation has no children to reconcile");
            return false;
        }
        let ids: Vec<ClusterInstallationId> = children.iter().map(|c| c.id.clone()).collect();
        if !lock::acquire(
            self.store.lock_cluster_installations(&ids, &self.instance_id),
            "cluster-installations",
            installation.id.as_str(),
        )
        .await
        {
            return false;
        }
        let driven = self.reconcile_children_locked(installation, &children, update).await;
        if let Err(error) =
            self.store.unlock_cluster_installations(&ids, &self.instance_id, false).await
        {
            warn!(installation_id = %installation.id, %error, "failed to unlock children");
        }
        driven
    }

    async fn reconcile_children_locked(
        &self,
        installation: &Installation,
        children: &[ClusterInstallation],
        update: &ChildUpdate,
    ) -> bool {
        let Some(provisioner) = self.provisioner_for(installation) else {
            return false;
        };
        for child in children {
            let Some(cluster) = self.cluster_of(child).await else {
                return false;
            };
            let result = match update {
                ChildUpdate::ApplySpec { cleanup_old_licenses } => {
                    if self.options.force_cr_upgrade {
                        if let Err(error) =
                            provisioner.ensure_cr_migrated(&cluster, installation).await
                        {
                            warn!(cluster_id = %cluster.id, %error, "cr migration failed");
                            return false;
                        }
                    }
                    let applied =
                        provisioner.ensure_cluster_installation(&cluster, installation, child).await;
                    match (applied, cleanup_old_licenses) {
                        (Ok(()), true) => {
                            provisioner
                                .delete_old_license_secrets(&cluster, installation, child)
                                .await
                        }
                        (result, _) => result,
                    }
                }
                ChildUpdate::Hibernate => {
                    provisioner.hibernate_cluster_installation(&cluster, installation, child).await
                }
            };
            if let Err(error) = result {
                warn!(cluster_installation_id = %child.id, %error, "child reconcile failed");
                return false;
            }
            if child.state != ClusterInstallationState::Reconciling {
                if let Err(error) = self
                    .store
                    .update_cluster_installation_state(
                        &child.id,
                        ClusterInstallationState::Reconciling,
                    )
                    .await
                {
                    warn!(cluster_installation_id = %child.id, %error, "failed to mark child reconciling");
                    return false;
                }
                events::record_transition(
                    self.store.as_ref(),
                    ResourceType::ClusterInstallation,
                    child.id.as_str(),
                    child.state.as_str(),
                    ClusterInstallationState::Reconciling.as_str(),
                    self.clock.epoch_ms(),
                )
                .await;
                let mut updated = child.clone();
                updated.state = ClusterInstallationState::Reconciling;
                events::notify_cluster_installation(self.producer.as_ref(), &updated, child.state)
                    .await;
            }
        }
        true
    }

    fn provisioner_for(&self, installation: &Installation) -> Option<Arc<dyn Provisioner>> {
        let provisioner = self.provisioners.get(&installation.cr_version);
        if provisioner.is_none() {
            warn!(
                installation_id = %installation.id,
                cr_version = %installation.cr_version,
                "no provisioner registered for cr version"
            );
        }
        provisioner
    }

    async fn children(
        &self,
        installation: &Installation,
    ) -> Result<Vec<ClusterInstallation>, StoreError> {
        let filter = ClusterInstallationFilter {
            installation_id: Some(installation.id.clone()),
            ..Default::default()
        };
        self.store.get_cluster_installations(&filter).await
    }

    async fn cluster_of(&self, child: &ClusterInstallation) -> Option<Cluster> {
        match self.store.get_cluster(&child.cluster_id).await {
            Ok(Some(cluster)) => Some(cluster),
            Ok(None) => {
                warn!(cluster_id = %child.cluster_id, "cluster not found for cluster installation");
                None
            }
            Err(error) => {
                warn!(cluster_id = %child.cluster_id, %error, "failed to load cluster");
                None
            }
        }
    }
}

#[async_trait]
impl<S, C> Doer for InstallationSupervisor<S, C>
where
    S: InstallationSupervisorStore + 'static,
    C: Clock,
{
    async fn run(&self) -> Result<(), EngineError> {
        let mut work = self.store.get_unlocked_installations_pending_work().await?;
        work.sort_by_key(|i| scan_priority(i.state));
        for installation in &work {
            self.supervise(installation).await;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "installation-supervisor"
    }
}

#[cfg(test)]
#[path = "installation_tests.rs"]
mod tests;
