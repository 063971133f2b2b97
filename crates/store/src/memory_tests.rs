// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gantry_core::FakeClock;

fn store() -> MemoryStore<FakeClock> {
    MemoryStore::with_clock(FakeClock::new())
}

#[tokio::test]
async fn lock_is_exclusive_per_row() {
    let store = store();
    let installation = store
        .create_installation(Installation::builder().build())
        .await
        .unwrap();

    assert!(store.lock_installation(&installation.id, "provisioner-a").await.unwrap());
    // Second locker is refused without an error, including the original holder.
    assert!(!store.lock_installation(&installation.id, "provisioner-b").await.unwrap());
    assert!(!store.lock_installation(&installation.id, "provisioner-a").await.unwrap());

    let held = store.get_installation(&installation.id).await.unwrap().unwrap();
    assert_eq!(held.lock_acquired_by.as_deref(), Some("provisioner-a"));
    assert!(held.lock_acquired_at > 0);
}

#[tokio::test]
async fn unlock_requires_the_holder_unless_forced() {
    let store = store();
    let installation = store
        .create_installation(Installation::builder().build())
        .await
        .unwrap();
    store.lock_installation(&installation.id, "provisioner-a").await.unwrap();

    assert!(!store.unlock_installation(&installation.id, "provisioner-b", false).await.unwrap());
    assert!(store.unlock_installation(&installation.id, "provisioner-b", true).await.unwrap());
    // Already released: nothing to unlock even with force.
    assert!(!store.unlock_installation(&installation.id, "provisioner-a", true).await.unwrap());
}

#[tokio::test]
async fn locking_a_missing_or_deleted_row_fails_quietly() {
    let store = store();
    let missing = InstallationId::from_string("ins-missing");
    assert!(!store.lock_installation(&missing, "locker").await.unwrap());

    let installation = store
        .create_installation(Installation::builder().build())
        .await
        .unwrap();
    store.delete_installation(&installation.id).await.unwrap();
    assert!(!store.lock_installation(&installation.id, "locker").await.unwrap());
}

#[tokio::test]
async fn plural_cluster_installation_lock_is_all_or_none() {
    let store = store();
    let a = store
        .create_cluster_installation(ClusterInstallation::builder().build())
        .await
        .unwrap();
    let b = store
        .create_cluster_installation(ClusterInstallation::builder().build())
        .await
        .unwrap();

    // b is already held, so the batch acquires nothing.
    store.lock_cluster_installation(&b.id, "other").await.unwrap();
    let ids = [a.id.clone(), b.id.clone()];
    assert!(!store.lock_cluster_installations(&ids, "locker").await.unwrap());
    let a_row = store.get_cluster_installation(&a.id).await.unwrap().unwrap();
    assert_eq!(a_row.lock_acquired_by, None);

    store.unlock_cluster_installation(&b.id, "other", false).await.unwrap();
    assert!(store.lock_cluster_installations(&ids, "locker").await.unwrap());
    for id in &ids {
        let row = store.get_cluster_installation(id).await.unwrap().unwrap();
        assert_eq!(row.lock_acquired_by.as_deref(), Some("locker"));
    }
}

#[tokio::test]
async fn pending_work_excludes_locked_and_deleted_rows() {
    let store = store();
    let pending = store
        .create_installation(
            Installation::builder().state(InstallationState::CreationRequested).build(),
        )
        .await
        .unwrap();
    let locked = store
        .create_installation(
            Installation::builder().state(InstallationState::UpdateRequested).build(),
        )
        .await
        .unwrap();
    store.lock_installation(&locked.id, "locker").await.unwrap();
    let stable = store
        .create_installation(Installation::builder().build())
        .await
        .unwrap();
    let deleted = store
        .create_installation(
            Installation::builder().state(InstallationState::DeletionRequested).build(),
        )
        .await
        .unwrap();
    store.delete_installation(&deleted.id).await.unwrap();

    let work = store.get_unlocked_installations_pending_work().await.unwrap();
    let ids: Vec<_> = work.iter().map(|i| i.id.clone()).collect();
    assert_eq!(ids, vec![pending.id]);
    assert!(!ids.contains(&stable.id));
}

#[tokio::test]
async fn update_preserves_lock_and_lifecycle_columns() {
    let store = store();
    let mut installation = store
        .create_installation(Installation::builder().build())
        .await
        .unwrap();
    store.lock_installation(&installation.id, "locker").await.unwrap();

    installation.version = "2.0.0".to_string();
    installation.lock_acquired_by = None; // must not clear the lock
    installation.create_at = 99; // must not rewrite history
    store.update_installation(&installation).await.unwrap();

    let stored = store.get_installation(&installation.id).await.unwrap().unwrap();
    assert_eq!(stored.version, "2.0.0");
    assert_eq!(stored.lock_acquired_by.as_deref(), Some("locker"));
    assert_ne!(stored.create_at, 99);
}

#[tokio::test]
async fn rolling_metadata_partitions_group_members() {
    let store = store();
    let group = store.create_group(Group::builder().sequence(5).build()).await.unwrap();

    // Out of date and stable: to be rolled.
    let behind = Installation::builder()
        .group_id(group.id.clone())
        .group_sequence(4u64)
        .build();
    let behind = store.create_installation(behind).await.unwrap();
    // Up to date: not rolled, not rolling.
    let current = Installation::builder()
        .group_id(group.id.clone())
        .group_sequence(5u64)
        .build();
    store.create_installation(current).await.unwrap();
    // Mid-update: rolling.
    let rolling = Installation::builder()
        .group_id(group.id.clone())
        .state(InstallationState::UpdateInProgress)
        .build();
    store.create_installation(rolling).await.unwrap();
    // Hibernating members are parked, not rolling.
    let hibernating = Installation::builder()
        .group_id(group.id.clone())
        .state(InstallationState::Hibernating)
        .build();
    store.create_installation(hibernating).await.unwrap();
    // Other groups don't count.
    store
        .create_installation(Installation::builder().group_sequence(1u64).build())
        .await
        .unwrap();

    let metadata = store.get_group_rolling_metadata(&group.id).await.unwrap();
    assert_eq!(metadata.installations_total, 4);
    assert_eq!(metadata.installations_rolling, 1);
    assert_eq!(metadata.ids_to_be_rolled, vec![behind.id]);
}

#[tokio::test]
async fn installations_status_counts_the_fleet() {
    let store = store();
    for state in [
        InstallationState::Stable,
        InstallationState::Stable,
        InstallationState::Hibernating,
        InstallationState::DeletionPending,
        InstallationState::UpdateInProgress,
        InstallationState::CreationRequested,
    ] {
        store
            .create_installation(Installation::builder().state(state).build())
            .await
            .unwrap();
    }

    let status = store.get_installations_status().await.unwrap();
    assert_eq!(status.total, 6);
    assert_eq!(status.stable, 2);
    assert_eq!(status.hibernating, 1);
    assert_eq!(status.deletion_pending, 1);
    assert_eq!(status.updating, 2);
}

#[tokio::test]
async fn latest_state_change_picks_the_newest_matching_event() {
    let store = store();
    for (timestamp, new_state) in [(10, "deletion-pending"), (30, "deletion-pending"), (20, "stable")] {
        store
            .record_state_change(
                StateChangeEvent::builder()
                    .resource_id("ins-a")
                    .new_state(new_state)
                    .timestamp(timestamp)
                    .build(),
            )
            .await
            .unwrap();
    }

    let latest = store
        .get_latest_state_change(ResourceType::Installation, "ins-a", "deletion-pending")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.timestamp, 30);

    let none = store
        .get_latest_state_change(ResourceType::Installation, "ins-b", "deletion-pending")
        .await
        .unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn installations_for_cluster_follows_live_links() {
    let store = store();
    let cluster = store.create_cluster(Cluster::builder().build()).await.unwrap();
    let installation = store
        .create_installation(Installation::builder().build())
        .await
        .unwrap();
    store
        .create_cluster_installation(
            ClusterInstallation::builder()
                .cluster_id(cluster.id.clone())
                .installation_id(installation.id.clone())
                .build(),
        )
        .await
        .unwrap();

    let hosted = store.get_installations_for_cluster(&cluster.id).await.unwrap();
    assert_eq!(hosted.len(), 1);
    assert_eq!(hosted[0].id, installation.id);

    let other = store.create_cluster(Cluster::builder().build()).await.unwrap();
    assert!(store.get_installations_for_cluster(&other.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn hard_delete_removes_cluster_installation_rows() {
    let store = store();
    let ci = store
        .create_cluster_installation(ClusterInstallation::builder().build())
        .await
        .unwrap();
    store.delete_cluster_installation(&ci.id).await.unwrap();
    assert!(store.get_cluster_installation(&ci.id).await.unwrap().is_none());
    assert!(matches!(
        store.delete_cluster_installation(&ci.id).await,
        Err(StoreError::NotFound { .. })
    ));
}

#[tokio::test]
async fn cluster_installation_filters_and_updates() {
    let store = store();
    let cluster = store.create_cluster(Cluster::builder().build()).await.unwrap();
    let mut ci = store
        .create_cluster_installation(
            ClusterInstallation::builder().cluster_id(cluster.id.clone()).build(),
        )
        .await
        .unwrap();
    store
        .create_cluster_installation(ClusterInstallation::builder().build())
        .await
        .unwrap();

    let on_cluster = store
        .get_cluster_installations(&ClusterInstallationFilter {
            cluster_id: Some(cluster.id.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(on_cluster.len(), 1);
    assert_eq!(on_cluster[0].id, ci.id);

    ci.namespace = "ns-renamed".to_string();
    store.update_cluster_installation(&ci).await.unwrap();
    let stored = store.get_cluster_installation(&ci.id).await.unwrap().unwrap();
    assert_eq!(stored.namespace, "ns-renamed");
}

#[tokio::test]
async fn backup_filter_matches_on_states() {
    let store = store();
    let installation = store
        .create_installation(Installation::builder().build())
        .await
        .unwrap();
    for state in [
        InstallationBackupState::Requested,
        InstallationBackupState::Succeeded,
        InstallationBackupState::Failed,
    ] {
        store
            .create_installation_backup(
                InstallationBackup::builder()
                    .installation_id(installation.id.clone())
                    .state(state)
                    .build(),
            )
            .await
            .unwrap();
    }

    let finished = store
        .get_installation_backups(&BackupFilter {
            installation_id: Some(installation.id.clone()),
            states: vec![
                InstallationBackupState::Succeeded,
                InstallationBackupState::Failed,
            ],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(finished.len(), 2);
}

#[tokio::test]
async fn duplicate_create_is_rejected() {
    let store = store();
    let installation = store
        .create_installation(Installation::builder().build())
        .await
        .unwrap();
    let result = store.create_installation(installation.clone()).await;
    assert!(matches!(result, Err(StoreError::Backend(_))));
}
