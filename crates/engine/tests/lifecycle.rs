// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end lifecycle runs against the in-memory store and fake
//! collaborators: full supervisor cycles, no hand-driven transitions.

use gantry_adapters::{
    FakeBackupOperator, FakeCloudClient, FakeProvisioner, ProvisionerRegistry,
    RecordingEventProducer,
};
use gantry_core::{
    Cluster, FakeClock, Installation, InstallationBackup, InstallationBackupState,
    InstallationId, InstallationState,
};
use gantry_engine::{
    BackupSupervisor, ClusterInstallationSupervisor, Doer, InstallationSupervisor,
    InstallationSupervisorOptions, MultiDoer, SchedulingOptions,
};
use gantry_store::{
    BackupStore, ClusterInstallationFilter, ClusterInstallationStore, ClusterStore,
    InstallationStore, MemoryStore,
};
use std::sync::Arc;

struct Plane {
    store: Arc<MemoryStore<FakeClock>>,
    provisioner: Arc<FakeProvisioner>,
    backup_operator: Arc<FakeBackupOperator>,
    engine: MultiDoer,
}

impl Plane {
    fn new() -> Self {
        let clock = FakeClock::new();
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        let provisioner = Arc::new(FakeProvisioner::new());
        let registry = Arc::new(ProvisionerRegistry::new().register("v1", provisioner.clone()));
        let cloud = Arc::new(FakeCloudClient::new());
        let producer = Arc::new(RecordingEventProducer::new());
        let backup_operator = Arc::new(FakeBackupOperator::new());

        let installation = Arc::new(InstallationSupervisor::new(
            store.clone(),
            registry.clone(),
            cloud,
            producer.clone(),
            "lifecycle-tests",
            SchedulingOptions::default(),
            InstallationSupervisorOptions::default(),
            clock.clone(),
        ));
        let cluster_installation = Arc::new(ClusterInstallationSupervisor::new(
            store.clone(),
            registry.clone(),
            producer.clone(),
            "lifecycle-tests",
            clock.clone(),
        ));
        let backup = Arc::new(BackupSupervisor::new(
            store.clone(),
            backup_operator.clone(),
            "lifecycle-tests",
            clock.clone(),
        ));
        let doers: Vec<Arc<dyn Doer>> = vec![installation, cluster_installation, backup];
        let engine = MultiDoer::new(doers);
        Self { store, provisioner, backup_operator, engine }
    }

    /// Run every supervisor until the fleet stops changing, like the
    /// schedulers would over a few periods.
    async fn settle(&self, max_cycles: usize) {
        for _ in 0..max_cycles {
            self.engine.run().await.expect("scan must not fail");
        }
    }

    async fn installation_state(&self, id: &InstallationId) -> InstallationState {
        self.store.get_installation(id).await.unwrap().unwrap().state
    }
}

#[tokio::test]
async fn installation_reaches_stable_from_creation_requested() {
    let plane = Plane::new();
    plane.store.create_cluster(Cluster::builder().build()).await.unwrap();
    let installation = plane
        .store
        .create_installation(
            Installation::builder().state(InstallationState::CreationRequested).build(),
        )
        .await
        .unwrap();

    plane.settle(8).await;

    assert_eq!(plane.installation_state(&installation.id).await, InstallationState::Stable);
    let children = plane
        .store
        .get_cluster_installations(&ClusterInstallationFilter::default())
        .await
        .unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(
        children[0].state,
        gantry_core::ClusterInstallationState::Stable
    );
    // Creation touched the provisioner exactly once per child.
    assert_eq!(plane.provisioner.call_count("create_cluster_installation"), 1);
}

#[tokio::test]
async fn hibernated_installation_backs_up_end_to_end() {
    let plane = Plane::new();
    plane.store.create_cluster(Cluster::builder().build()).await.unwrap();
    let installation = plane
        .store
        .create_installation(
            Installation::builder().state(InstallationState::CreationRequested).build(),
        )
        .await
        .unwrap();
    plane.settle(8).await;

    // Hibernate, then request a backup once the fleet settles.
    plane
        .store
        .update_installation_state(&installation.id, InstallationState::HibernationRequested)
        .await
        .unwrap();
    plane.settle(6).await;
    assert_eq!(
        plane.installation_state(&installation.id).await,
        InstallationState::Hibernating
    );

    let backup = plane
        .store
        .create_installation_backup(
            InstallationBackup::builder().installation_id(installation.id.clone()).build(),
        )
        .await
        .unwrap();
    plane.backup_operator.set_status(Some(1_000_900));
    plane.settle(4).await;

    let backup = plane.store.get_installation_backup(&backup.id).await.unwrap().unwrap();
    assert_eq!(backup.state, InstallationBackupState::Succeeded);
    assert_eq!(backup.start_at, 1_000_900);
}

#[tokio::test]
async fn deletion_tears_the_installation_down_end_to_end() {
    let plane = Plane::new();
    plane.store.create_cluster(Cluster::builder().build()).await.unwrap();
    let installation = plane
        .store
        .create_installation(
            Installation::builder().state(InstallationState::CreationRequested).build(),
        )
        .await
        .unwrap();
    plane.settle(8).await;

    plane
        .store
        .update_installation_state(&installation.id, InstallationState::DeletionRequested)
        .await
        .unwrap();
    plane.settle(8).await;

    assert_eq!(plane.installation_state(&installation.id).await, InstallationState::Deleted);
    let stored = plane.store.get_installation(&installation.id).await.unwrap().unwrap();
    assert!(stored.is_deleted());
    let children = plane
        .store
        .get_cluster_installations(&ClusterInstallationFilter::default())
        .await
        .unwrap();
    assert!(children.is_empty(), "child rows are hard-deleted after teardown");
}
