// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gantry_adapters::{FakeProvisioner, RecordingEventProducer};
use gantry_core::{Clock, ClusterInstallation, FakeClock, Size};
use gantry_store::{ClusterInstallationStore, MemoryStore};
use std::collections::BTreeSet;
use std::time::Duration;

struct Setup {
    store: MemoryStore<FakeClock>,
    clock: FakeClock,
    provisioner: FakeProvisioner,
    producer: RecordingEventProducer,
}

impl Setup {
    fn new() -> Self {
        let clock = FakeClock::new();
        Self {
            store: MemoryStore::with_clock(clock.clone()),
            clock,
            provisioner: FakeProvisioner::new(),
            producer: RecordingEventProducer::new(),
        }
    }

    async fn select(
        &self,
        options: &SchedulingOptions,
        installation: &Installation,
    ) -> Result<Option<Cluster>, PlacementError> {
        select_cluster_for_installation(
            &self.store,
            &self.provisioner,
            &self.producer,
            options,
            self.clock.epoch_ms(),
            installation,
        )
        .await
    }
}

fn annotations(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Resources at 40% CPU; a Small installation (500 mCPU) projects to 90%.
fn tight_cpu() -> ClusterResources {
    ClusterResources {
        milli_total_cpu: 1_000,
        milli_used_cpu: 400,
        milli_total_memory: 1_000_000_000,
        milli_used_memory: 0,
        total_pod_count: 10_000,
        used_pod_count: 0,
    }
}

#[tokio::test]
async fn empty_fleet_yields_no_candidate() {
    let setup = Setup::new();
    let installation = Installation::builder().build();
    let selected = setup.select(&SchedulingOptions::default(), &installation).await.unwrap();
    assert!(selected.is_none());
}

#[tokio::test]
async fn unschedulable_clusters_are_never_candidates() {
    let setup = Setup::new();
    setup
        .store
        .create_cluster(Cluster::builder().allow_installations(false).build())
        .await
        .unwrap();
    setup
        .store
        .create_cluster(Cluster::builder().state(ClusterState::Provisioning).build())
        .await
        .unwrap();

    let installation = Installation::builder().build();
    let selected = setup.select(&SchedulingOptions::default(), &installation).await.unwrap();
    assert!(selected.is_none());
}

#[tokio::test]
async fn annotations_must_be_offered_by_the_cluster() {
    let setup = Setup::new();
    setup
        .store
        .create_cluster(Cluster::builder().annotations(annotations(&["ssd"])).build())
        .await
        .unwrap();

    let demanding = Installation::builder().annotations(annotations(&["ssd", "gpu"])).build();
    assert!(setup.select(&SchedulingOptions::default(), &demanding).await.unwrap().is_none());

    let satisfied = Installation::builder().annotations(annotations(&["ssd"])).build();
    assert!(setup.select(&SchedulingOptions::default(), &satisfied).await.unwrap().is_some());

    let unannotated = Installation::builder().build();
    assert!(setup.select(&SchedulingOptions::default(), &unannotated).await.unwrap().is_some());
}

#[tokio::test]
async fn projected_request_over_threshold_drops_the_candidate() {
    let setup = Setup::new();
    setup.store.create_cluster(Cluster::builder().build()).await.unwrap();
    setup.provisioner.set_cluster_resources(tight_cpu());

    let installation = Installation::builder().size(Size::Small).build();
    let selected = setup.select(&SchedulingOptions::default(), &installation).await.unwrap();
    assert!(selected.is_none(), "90% projected cpu must trip the 80% threshold");
}

#[tokio::test]
async fn scale_value_keeps_the_candidate_and_requests_resize() {
    let setup = Setup::new();
    let cluster = setup.store.create_cluster(Cluster::builder().build()).await.unwrap();
    setup.provisioner.set_cluster_resources(tight_cpu());

    let options = SchedulingOptions::default().cluster_resource_threshold_scale_value(2);
    let installation = Installation::builder().size(Size::Small).build();
    let selected = setup.select(&options, &installation).await.unwrap();

    assert_eq!(selected.map(|c| c.id), Some(cluster.id.clone()));
    let stored = setup.store.get_cluster(&cluster.id).await.unwrap().unwrap();
    assert_eq!(stored.state, ClusterState::ResizeRequested);
    // The cluster transition is announced like any other.
    let events = setup.producer.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].new_state, "resize-requested");
}

#[tokio::test]
async fn zero_capacity_dimension_always_trips() {
    let setup = Setup::new();
    setup.store.create_cluster(Cluster::builder().build()).await.unwrap();
    setup.provisioner.set_cluster_resources(ClusterResources::default());

    let installation = Installation::builder().build();
    let selected = setup.select(&SchedulingOptions::default(), &installation).await.unwrap();
    assert!(selected.is_none());
}

#[tokio::test]
async fn isolated_installations_require_an_empty_cluster() {
    let setup = Setup::new();
    let occupied = setup.store.create_cluster(Cluster::builder().build()).await.unwrap();
    let tenant = setup.store.create_installation(Installation::builder().build()).await.unwrap();
    setup
        .store
        .create_cluster_installation(
            ClusterInstallation::builder()
                .cluster_id(occupied.id.clone())
                .installation_id(tenant.id.clone())
                .build(),
        )
        .await
        .unwrap();

    let isolated = Installation::builder().affinity(Affinity::Isolated).build();
    assert!(setup.select(&SchedulingOptions::default(), &isolated).await.unwrap().is_none());

    let empty = setup.store.create_cluster(Cluster::builder().build()).await.unwrap();
    let selected = setup.select(&SchedulingOptions::default(), &isolated).await.unwrap();
    assert_eq!(selected.map(|c| c.id), Some(empty.id));
}

#[tokio::test]
async fn multi_tenant_prefers_clusters_hosting_the_same_group() {
    let setup = Setup::new();
    let group_id = gantry_core::GroupId::new();

    // The older cluster hosts an unrelated tenant; the newer one hosts a
    // member of the same group and must win despite its age.
    let older = setup.store.create_cluster(Cluster::builder().build()).await.unwrap();
    setup.clock.advance(Duration::from_secs(60));
    let newer = setup.store.create_cluster(Cluster::builder().build()).await.unwrap();

    let unrelated =
        setup.store.create_installation(Installation::builder().build()).await.unwrap();
    setup
        .store
        .create_cluster_installation(
            ClusterInstallation::builder()
                .cluster_id(older.id.clone())
                .installation_id(unrelated.id.clone())
                .build(),
        )
        .await
        .unwrap();
    let member = setup
        .store
        .create_installation(Installation::builder().group_id(group_id.clone()).build())
        .await
        .unwrap();
    setup
        .store
        .create_cluster_installation(
            ClusterInstallation::builder()
                .cluster_id(newer.id.clone())
                .installation_id(member.id.clone())
                .build(),
        )
        .await
        .unwrap();

    let joining = Installation::builder().group_id(group_id).build();
    let selected = setup.select(&SchedulingOptions::default(), &joining).await.unwrap();
    assert_eq!(selected.map(|c| c.id), Some(newer.id));
}

#[tokio::test]
async fn balancing_prefers_the_emptiest_cluster() {
    let setup = Setup::new();
    let busy = setup.store.create_cluster(Cluster::builder().build()).await.unwrap();
    let idle = setup.store.create_cluster(Cluster::builder().build()).await.unwrap();
    for _ in 0..2 {
        let tenant =
            setup.store.create_installation(Installation::builder().build()).await.unwrap();
        setup
            .store
            .create_cluster_installation(
                ClusterInstallation::builder()
                    .cluster_id(busy.id.clone())
                    .installation_id(tenant.id.clone())
                    .build(),
            )
            .await
            .unwrap();
    }

    let options = SchedulingOptions::default().balance_installations(true);
    let installation = Installation::builder().build();
    let selected = setup.select(&options, &installation).await.unwrap();
    assert_eq!(selected.map(|c| c.id), Some(idle.id));
}

#[tokio::test]
async fn without_balancing_the_oldest_cluster_wins() {
    let setup = Setup::new();
    let first = setup.store.create_cluster(Cluster::builder().build()).await.unwrap();
    setup.clock.advance(Duration::from_secs(60));
    setup.store.create_cluster(Cluster::builder().build()).await.unwrap();

    let installation = Installation::builder().build();
    let selected = setup.select(&SchedulingOptions::default(), &installation).await.unwrap();
    assert_eq!(selected.map(|c| c.id), Some(first.id));
}
