// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixture for supervisor tests: an in-memory store on a fake clock
//! plus one of every fake collaborator, wired the way the host process
//! wires the real ones.

use crate::options::{
    DeletionSupervisorOptions, InstallationSupervisorOptions, SchedulingOptions,
};
use crate::supervisors::backup::BackupSupervisor;
use crate::supervisors::cluster_installation::ClusterInstallationSupervisor;
use crate::supervisors::deletion::InstallationDeletionSupervisor;
use crate::supervisors::group::GroupSupervisor;
use crate::supervisors::installation::InstallationSupervisor;
use crate::supervisors::migration::MigrationSupervisor;
use crate::supervisors::restoration::RestorationSupervisor;
use gantry_adapters::{
    FakeBackupOperator, FakeCloudClient, FakeDbMigrationOperator, FakeProvisioner,
    FakeRestoreOperator, ProvisionerRegistry, RecordingEventProducer,
};
use gantry_core::{
    Cluster, ClusterInstallation, ClusterInstallationState, FakeClock, Group, Installation,
    InstallationId, InstallationState,
};
use gantry_store::{ClusterInstallationStore, ClusterStore, InstallationStore, MemoryStore};
use std::sync::Arc;

pub(crate) const INSTANCE_ID: &str = "provisioner-1";

pub(crate) type TestStore = MemoryStore<FakeClock>;

pub(crate) struct Fixture {
    pub store: Arc<TestStore>,
    pub clock: FakeClock,
    pub provisioner: Arc<FakeProvisioner>,
    pub registry: Arc<ProvisionerRegistry>,
    pub cloud: Arc<FakeCloudClient>,
    pub producer: Arc<RecordingEventProducer>,
    pub backup_operator: Arc<FakeBackupOperator>,
    pub restore_operator: Arc<FakeRestoreOperator>,
    pub migration_operator: Arc<FakeDbMigrationOperator>,
}

impl Fixture {
    pub fn new() -> Self {
        let clock = FakeClock::new();
        let provisioner = Arc::new(FakeProvisioner::new());
        let registry =
            Arc::new(ProvisionerRegistry::new().register("v1", provisioner.clone()));
        Self {
            store: Arc::new(MemoryStore::with_clock(clock.clone())),
            clock,
            provisioner,
            registry,
            cloud: Arc::new(FakeCloudClient::new()),
            producer: Arc::new(RecordingEventProducer::new()),
            backup_operator: Arc::new(FakeBackupOperator::new()),
            restore_operator: Arc::new(FakeRestoreOperator::new()),
            migration_operator: Arc::new(FakeDbMigrationOperator::new()),
        }
    }

    pub fn installation_supervisor(&self) -> InstallationSupervisor<TestStore, FakeClock> {
        self.installation_supervisor_with(
            SchedulingOptions::default(),
            InstallationSupervisorOptions::default(),
        )
    }

    pub fn installation_supervisor_with(
        &self,
        scheduling: SchedulingOptions,
        options: InstallationSupervisorOptions,
    ) -> InstallationSupervisor<TestStore, FakeClock> {
        InstallationSupervisor::new(
            self.store.clone(),
            self.registry.clone(),
            self.cloud.clone(),
            self.producer.clone(),
            INSTANCE_ID,
            scheduling,
            options,
            self.clock.clone(),
        )
    }

    pub fn cluster_installation_supervisor(
        &self,
    ) -> ClusterInstallationSupervisor<TestStore, FakeClock> {
        ClusterInstallationSupervisor::new(
            self.store.clone(),
            self.registry.clone(),
            self.producer.clone(),
            INSTANCE_ID,
            self.clock.clone(),
        )
    }

    pub fn group_supervisor(&self) -> GroupSupervisor<TestStore, FakeClock> {
        GroupSupervisor::new(
            self.store.clone(),
            self.producer.clone(),
            INSTANCE_ID,
            self.clock.clone(),
        )
        .with_rng_seed(7)
    }

    pub fn backup_supervisor(&self) -> BackupSupervisor<TestStore, FakeClock> {
        BackupSupervisor::new(
            self.store.clone(),
            self.backup_operator.clone(),
            INSTANCE_ID,
            self.clock.clone(),
        )
    }

    pub fn restoration_supervisor(&self) -> RestorationSupervisor<TestStore, FakeClock> {
        RestorationSupervisor::new(
            self.store.clone(),
            self.restore_operator.clone(),
            INSTANCE_ID,
            self.clock.clone(),
        )
    }

    pub fn migration_supervisor(&self) -> MigrationSupervisor<TestStore, FakeClock> {
        MigrationSupervisor::new(
            self.store.clone(),
            self.registry.clone(),
            self.migration_operator.clone(),
            self.producer.clone(),
            INSTANCE_ID,
            self.clock.clone(),
        )
    }

    pub fn deletion_supervisor(
        &self,
        options: DeletionSupervisorOptions,
    ) -> InstallationDeletionSupervisor<TestStore, FakeClock> {
        InstallationDeletionSupervisor::new(
            self.store.clone(),
            self.producer.clone(),
            INSTANCE_ID,
            options,
            self.clock.clone(),
        )
    }

    pub async fn seed_cluster(&self) -> Cluster {
        self.store.create_cluster(Cluster::builder().build()).await.unwrap()
    }

    pub async fn seed_installation(&self, state: InstallationState) -> Installation {
        self.store
            .create_installation(Installation::builder().state(state).build())
            .await
            .unwrap()
    }

    pub async fn seed_child(
        &self,
        installation: &Installation,
        cluster: &Cluster,
        state: ClusterInstallationState,
    ) -> ClusterInstallation {
        self.store
            .create_cluster_installation(
                ClusterInstallation::builder()
                    .installation_id(installation.id.clone())
                    .cluster_id(cluster.id.clone())
                    .state(state)
                    .build(),
            )
            .await
            .unwrap()
    }

    pub async fn seed_group_member(
        &self,
        group: &Group,
        sequence: Option<u64>,
        state: InstallationState,
    ) -> Installation {
        let mut builder = Installation::builder().group_id(group.id.clone()).state(state);
        if let Some(sequence) = sequence {
            builder = builder.group_sequence(sequence);
        }
        self.store.create_installation(builder.build()).await.unwrap()
    }

    pub async fn installation_state(&self, id: &InstallationId) -> InstallationState {
        self.store.get_installation(id).await.unwrap().unwrap().state
    }
}
