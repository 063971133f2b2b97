// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Database-migration supervisor: moves an installation's database between
//! backings.
//!
//! The workflow composes a backup leg and a restoration leg, each driven by
//! its own supervisor; the migration record watches their outcomes.
//! Backup outcomes map `succeeded → database-switch` and `failed → failing`.
//! Restoration outcomes map `succeeded → updating-installation-config`;
//! anything else that is no longer making progress maps to `failing`.

use crate::doer::Doer;
use crate::error::EngineError;
use crate::{events, lock};
use async_trait::async_trait;
use gantry_adapters::{DbMigrationOperator, EventProducer, ProvisionerRegistry};
use gantry_core::{
    Clock, ClusterInstallation, Installation, InstallationBackup, InstallationBackupId,
    InstallationBackupState, InstallationDbMigrationOperation,
    InstallationDbRestorationOperation, InstallationDbRestorationOperationId, InstallationState,
    MigrationState, ResourceType, RestorationState, SystemClock,
};
use gantry_store::{
    BackupStore, ClusterInstallationFilter, ClusterInstallationStore, ClusterStore, EventStore,
    InstallationStore, MigrationStore, RestorationStore,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Store surface the migration supervisor needs.
pub trait MigrationSupervisorStore:
    MigrationStore
    + RestorationStore
    + BackupStore
    + InstallationStore
    + ClusterInstallationStore
    + ClusterStore
    + EventStore
{
}

impl<T> MigrationSupervisorStore for T where
    T: MigrationStore
        + RestorationStore
        + BackupStore
        + InstallationStore
        + ClusterInstallationStore
        + ClusterStore
        + EventStore
{
}

/// Supervisor for [`InstallationDbMigrationOperation`] resources.
pub struct MigrationSupervisor<S, C = SystemClock> {
    store: Arc<S>,
    provisioners: Arc<ProvisionerRegistry>,
    operator: Arc<dyn DbMigrationOperator>,
    producer: Arc<dyn EventProducer>,
    instance_id: String,
    clock: C,
}

impl<S, C> MigrationSupervisor<S, C>
where
    S: MigrationSupervisorStore,
    C: Clock,
{
    pub fn new(
        store: Arc<S>,
        provisioners: Arc<ProvisionerRegistry>,
        operator: Arc<dyn DbMigrationOperator>,
        producer: Arc<dyn EventProducer>,
        instance_id: impl Into<String>,
        clock: C,
    ) -> Self {
        Self {
            store,
            provisioners,
            operator,
            producer,
            instance_id: instance_id.into(),
            clock,
        }
    }

    /// Advance one migration by at most one state.
    pub async fn supervise(&self, observed: &InstallationDbMigrationOperation) {
        let id = observed.id.clone();
        if !lock::acquire(
            self.store.lock_installation_db_migration(&id, &self.instance_id),
            "migration",
            id.as_str(),
        )
        .await
        {
            return;
        }
        self.supervise_locked(observed).await;
        lock::release(
            self.store.unlock_installation_db_migration(&id, &self.instance_id, false),
            "migration",
            id.as_str(),
        )
        .await;
    }

    async fn supervise_locked(&self, observed: &InstallationDbMigrationOperation) {
        let migration = match self.store.get_installation_db_migration(&observed.id).await {
            Ok(Some(migration)) => migration,
            Ok(None) => {
                warn!(migration_id = %observed.id, "migration disappeared before supervision");
                return;
            }
            Err(error) => {
                warn!(migration_id = %observed.id, %error, "failed to reload migration");
                return;
            }
        };
        if migration.state != observed.state {
            debug!(
                migration_id = %migration.id,
                observed = observed.state.as_str(),
                current = migration.state.as_str(),
                "state moved since scan, yielding"
            );
            return;
        }

        let old_state = migration.state;
        let new_state = match old_state {
            MigrationState::Requested => self.handle_requested(&migration).await,
            MigrationState::BackupInProgress => self.handle_backup_in_progress(&migration).await,
            MigrationState::DatabaseSwitch => self.handle_database_switch(&migration).await,
            MigrationState::RefreshSecrets => self.handle_refresh_secrets(&migration).await,
            MigrationState::TriggerRestoration => {
                self.handle_trigger_restoration(&migration).await
            }
            MigrationState::RestorationInProgress => {
                self.handle_restoration_in_progress(&migration).await
            }
            MigrationState::UpdatingInstallationConfig => {
                self.handle_updating_installation_config(&migration).await
            }
            MigrationState::Finalizing => self.handle_finalizing(&migration).await,
            MigrationState::Failing => self.handle_failing(&migration).await,
            other => {
                warn!(migration_id = %migration.id, state = other.as_str(), "unexpected migration state");
                other
            }
        };
        if new_state == old_state {
            return;
        }

        if let Err(error) =
            self.store.update_installation_db_migration_state(&migration.id, new_state).await
        {
            warn!(migration_id = %migration.id, %error, "failed to persist new state");
            return;
        }
        events::record_transition(
            self.store.as_ref(),
            ResourceType::InstallationDbMigration,
            migration.id.as_str(),
            old_state.as_str(),
            new_state.as_str(),
            self.clock.epoch_ms(),
        )
        .await;
    }

    async fn handle_requested(
        &self,
        migration: &InstallationDbMigrationOperation,
    ) -> MigrationState {
        let Some(installation) = self.installation_of(migration).await else {
            return MigrationState::Failing;
        };
        if installation.state != InstallationState::Hibernating
            && installation.state != InstallationState::DbMigrationInProgress
        {
            warn!(
                migration_id = %migration.id,
                installation_state = installation.state.as_str(),
                "installation not hibernated, migration cannot start"
            );
            return migration.state;
        }

        // Park the installation for the duration of the migration.
        if installation.state != InstallationState::DbMigrationInProgress {
            if !self
                .move_installation(&installation, InstallationState::DbMigrationInProgress)
                .await
            {
                return migration.state;
            }
        }

        // Crash-safe: reuse a backup leg created by an earlier attempt.
        if migration.backup_id.is_some() {
            return MigrationState::BackupInProgress;
        }
        let backup = InstallationBackup {
            id: InstallationBackupId::new(),
            installation_id: migration.installation_id.clone(),
            cluster_installation_id: None,
            data_residence: None,
            state: InstallationBackupState::Requested,
            start_at: 0,
            create_at: 0,
            delete_at: 0,
            lock_acquired_by: None,
            lock_acquired_at: 0,
        };
        let backup = match self.store.create_installation_backup(backup).await {
            Ok(backup) => backup,
            Err(error) => {
                warn!(migration_id = %migration.id, %error, "failed to create backup leg");
                return migration.state;
            }
        };
        let mut updated = migration.clone();
        updated.backup_id = Some(backup.id.clone());
        if let Err(error) = self.store.update_installation_db_migration(&updated).await {
            warn!(migration_id = %migration.id, %error, "failed to link backup leg");
            return migration.state;
        }
        info!(migration_id = %migration.id, backup_id = %backup.id, "migration backup started");
        MigrationState::BackupInProgress
    }

    async fn handle_backup_in_progress(
        &self,
        migration: &InstallationDbMigrationOperation,
    ) -> MigrationState {
        let Some(backup_id) = migration.backup_id.as_ref() else {
            warn!(migration_id = %migration.id, "migration has no backup leg");
            return MigrationState::Failing;
        };
        let backup = match self.store.get_installation_backup(backup_id).await {
            Ok(Some(backup)) => backup,
            Ok(None) => {
                warn!(migration_id = %migration.id, "backup leg not found");
                return MigrationState::Failing;
            }
            Err(error) => {
                warn!(migration_id = %migration.id, %error, "failed to load backup leg");
                return migration.state;
            }
        };
        match backup.state {
            InstallationBackupState::Succeeded => MigrationState::DatabaseSwitch,
            InstallationBackupState::Failed => {
                warn!(migration_id = %migration.id, "backup leg failed");
                MigrationState::Failing
            }
            _ => {
                debug!(migration_id = %migration.id, backup_state = backup.state.as_str(), "backup leg still running");
                migration.state
            }
        }
    }

    async fn handle_database_switch(
        &self,
        migration: &InstallationDbMigrationOperation,
    ) -> MigrationState {
        let Some(installation) = self.installation_of(migration).await else {
            return MigrationState::Failing;
        };
        if let Err(error) =
            self.operator.migrate_out(&installation, migration.source_database).await
        {
            warn!(migration_id = %migration.id, %error, "failed to detach source database");
            return migration.state;
        }
        if let Err(error) =
            self.operator.migrate_to(&installation, migration.destination_database).await
        {
            warn!(migration_id = %migration.id, %error, "failed to attach destination database");
            return migration.state;
        }
        let mut switched = installation.clone();
        switched.database = migration.destination_database;
        if let Err(error) = self.store.update_installation(&switched).await {
            warn!(migration_id = %migration.id, %error, "failed to switch installation database");
            return migration.state;
        }
        info!(
            migration_id = %migration.id,
            database = migration.destination_database.as_str(),
            "installation switched to destination database"
        );
        MigrationState::RefreshSecrets
    }

    async fn handle_refresh_secrets(
        &self,
        migration: &InstallationDbMigrationOperation,
    ) -> MigrationState {
        let Some(installation) = self.installation_of(migration).await else {
            return MigrationState::Failing;
        };
        let Some(provisioner) = self.provisioners.get(&installation.cr_version) else {
            warn!(
                migration_id = %migration.id,
                cr_version = %installation.cr_version,
                "no provisioner registered for cr version"
            );
            return migration.state;
        };
        let children = match self.children_of(&installation).await {
            Some(children) => children,
            None => return migration.state,
        };
        for child in &children {
            let cluster = match self.store.get_cluster(&child.cluster_id).await {
                Ok(Some(cluster)) => cluster,
                Ok(None) => {
                    warn!(cluster_id = %child.cluster_id, "cluster not found");
                    return migration.state;
                }
                Err(error) => {
                    warn!(cluster_id = %child.cluster_id, %error, "failed to load cluster");
                    return migration.state;
                }
            };
            if let Err(error) =
                provisioner.refresh_secrets(&cluster, &installation, child).await
            {
                warn!(cluster_installation_id = %child.id, %error, "failed to refresh secrets");
                return migration.state;
            }
        }
        MigrationState::TriggerRestoration
    }

    async fn handle_trigger_restoration(
        &self,
        migration: &InstallationDbMigrationOperation,
    ) -> MigrationState {
        let Some(backup_id) = migration.backup_id.as_ref() else {
            warn!(migration_id = %migration.id, "migration has no backup leg");
            return MigrationState::Failing;
        };
        // Crash-safe: reuse a restoration leg created by an earlier attempt.
        if migration.restoration_id.is_some() {
            return MigrationState::RestorationInProgress;
        }
        let restoration = InstallationDbRestorationOperation {
            id: InstallationDbRestorationOperationId::new(),
            installation_id: migration.installation_id.clone(),
            backup_id: backup_id.clone(),
            cluster_installation_id: None,
            target_installation_state: InstallationState::DbMigrationInProgress,
            state: RestorationState::Requested,
            create_at: 0,
            delete_at: 0,
            lock_acquired_by: None,
            lock_acquired_at: 0,
        };
        let restoration = match self.store.create_installation_db_restoration(restoration).await
        {
            Ok(restoration) => restoration,
            Err(error) => {
                warn!(migration_id = %migration.id, %error, "failed to create restoration leg");
                return migration.state;
            }
        };
        let mut updated = migration.clone();
        updated.restoration_id = Some(restoration.id.clone());
        if let Err(error) = self.store.update_installation_db_migration(&updated).await {
            warn!(migration_id = %migration.id, %error, "failed to link restoration leg");
            return migration.state;
        }
        info!(
            migration_id = %migration.id,
            restoration_id = %restoration.id,
            "migration restoration started"
        );
        MigrationState::RestorationInProgress
    }

    async fn handle_restoration_in_progress(
        &self,
        migration: &InstallationDbMigrationOperation,
    ) -> MigrationState {
        let Some(restoration_id) = migration.restoration_id.as_ref() else {
            warn!(migration_id = %migration.id, "migration has no restoration leg");
            return MigrationState::Failing;
        };
        let restoration = match self.store.get_installation_db_restoration(restoration_id).await
        {
            Ok(Some(restoration)) => restoration,
            Ok(None) => {
                warn!(migration_id = %migration.id, "restoration leg not found");
                return MigrationState::Failing;
            }
            Err(error) => {
                warn!(migration_id = %migration.id, %error, "failed to load restoration leg");
                return migration.state;
            }
        };
        match restoration.state {
            RestorationState::Succeeded => MigrationState::UpdatingInstallationConfig,
            RestorationState::Failed | RestorationState::Failing => {
                warn!(migration_id = %migration.id, "restoration leg failed");
                MigrationState::Failing
            }
            _ => {
                debug!(
                    migration_id = %migration.id,
                    restoration_state = restoration.state.as_str(),
                    "restoration leg still running"
                );
                migration.state
            }
        }
    }

    async fn handle_updating_installation_config(
        &self,
        migration: &InstallationDbMigrationOperation,
    ) -> MigrationState {
        let Some(installation) = self.installation_of(migration).await else {
            return MigrationState::Failing;
        };
        let Some(provisioner) = self.provisioners.get(&installation.cr_version) else {
            warn!(
                migration_id = %migration.id,
                cr_version = %installation.cr_version,
                "no provisioner registered for cr version"
            );
            return migration.state;
        };
        let children = match self.children_of(&installation).await {
            Some(children) => children,
            None => return migration.state,
        };
        for child in &children {
            let cluster = match self.store.get_cluster(&child.cluster_id).await {
                Ok(Some(cluster)) => cluster,
                Ok(None) => {
                    warn!(cluster_id = %child.cluster_id, "cluster not found");
                    return migration.state;
                }
                Err(error) => {
                    warn!(cluster_id = %child.cluster_id, %error, "failed to load cluster");
                    return migration.state;
                }
            };
            if let Err(error) =
                provisioner.ensure_cluster_installation(&cluster, &installation, child).await
            {
                warn!(cluster_installation_id = %child.id, %error, "failed to update workload config");
                return migration.state;
            }
        }
        MigrationState::Finalizing
    }

    async fn handle_finalizing(
        &self,
        migration: &InstallationDbMigrationOperation,
    ) -> MigrationState {
        let Some(installation) = self.installation_of(migration).await else {
            return MigrationState::Failing;
        };
        if let Err(error) =
            self.operator.teardown_migrated(&installation, migration.source_database).await
        {
            warn!(migration_id = %migration.id, %error, "failed to tear down source database");
            return migration.state;
        }
        if !self.move_installation(&installation, InstallationState::Hibernating).await {
            return migration.state;
        }
        info!(migration_id = %migration.id, "migration succeeded");
        MigrationState::Succeeded
    }

    async fn handle_failing(
        &self,
        migration: &InstallationDbMigrationOperation,
    ) -> MigrationState {
        let Some(installation) = self.installation_of(migration).await else {
            // Nothing left to roll back.
            return MigrationState::Failed;
        };
        if let Err(error) = self.operator.rollback_migration(&installation, migration).await {
            warn!(migration_id = %migration.id, %error, "migration rollback failed");
            return migration.state;
        }
        let mut rolled_back = installation.clone();
        rolled_back.database = migration.source_database;
        if let Err(error) = self.store.update_installation(&rolled_back).await {
            warn!(migration_id = %migration.id, %error, "failed to restore source database");
            return migration.state;
        }
        if !self.move_installation(&rolled_back, InstallationState::DbMigrationFailed).await {
            return migration.state;
        }
        warn!(migration_id = %migration.id, "migration failed");
        MigrationState::Failed
    }

    /// Move the installation to `state` with an audit event and producer
    /// notification. Returns false on store failure.
    async fn move_installation(&self, installation: &Installation, state: InstallationState) -> bool {
        if installation.state == state {
            return true;
        }
        if let Err(error) = self.store.update_installation_state(&installation.id, state).await {
            warn!(installation_id = %installation.id, %error, "failed to move installation");
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
        let mut updated = installation.clone();
        updated.state = state;
        events::notify_installation(self.producer.as_ref(), &updated, installation.state).await;
        true
    }

    async fn installation_of(
        &self,
        migration: &InstallationDbMigrationOperation,
    ) -> Option<Installation> {
        match self.store.get_installation(&migration.installation_id).await {
            Ok(Some(installation)) if !installation.is_deleted() => Some(installation),
            Ok(_) => {
                warn!(
                    migration_id = %migration.id,
                    installation_id = %migration.installation_id,
                    "installation deleted or missing"
                );
                None
            }
            Err(error) => {
                warn!(migration_id = %migration.id, %error, "failed to load installation");
                None
            }
        }
    }

    async fn children_of(&self, installation: &Installation) -> Option<Vec<ClusterInstallation>> {
        let filter = ClusterInstallationFilter {
            installation_id: Some(installation.id.clone()),
            ..Default::default()
        };
        match self.store.get_cluster_installations(&filter).await {
            Ok(children) => Some(children),
            Err(error) => {
                warn!(installation_id = %installation.id, %error, "failed to list children");
                None
            }
        }
    }
}

#[async_trait]
impl<S, C> Doer for MigrationSupervisor<S, C>
where
    S: MigrationSupervisorStore + 'static,
    C: Clock,
{
    async fn run(&self) -> Result<(), EngineError> {
        let work = self.store.get_unlocked_installation_db_migrations_pending_work().await?;
        for migration in &work {
            self.supervise(migration).await;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "migration-supervisor"
    }
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
