// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::supervisors::test_fixtures::Fixture;

struct Seeded {
    backup: InstallationBackup,
}

/// A hibernated installation with one stable child and a requested backup.
async fn seed(fixture: &Fixture) -> Seeded {
    let cluster = fixture.seed_cluster().await;
    let installation = fixture.seed_installation(InstallationState::Hibernating).await;
    fixture.seed_child(&installation, &cluster, ClusterInstallationState::Stable).await;
    let backup = fixture
        .store
        .create_installation_backup(
            InstallationBackup::builder().installation_id(installation.id.clone()).build(),
        )
        .await
        .unwrap();
    Seeded { backup }
}

async fn backup_state(fixture: &Fixture, backup: &InstallationBackup) -> InstallationBackupState {
    fixture.store.get_installation_backup(&backup.id).await.unwrap().unwrap().state
}

#[tokio::test]
async fn requested_backup_triggers_and_records_its_residence() {
    let fixture = Fixture::new();
    let seeded = seed(&fixture).await;

    fixture.backup_supervisor().supervise(&seeded.backup).await;

    let stored =
        fixture.store.get_installation_backup(&seeded.backup.id).await.unwrap().unwrap();
    assert_eq!(stored.state, InstallationBackupState::InProgress);
    assert!(stored.cluster_installation_id.is_some());
    assert!(stored.data_residence.is_some());
    assert_eq!(stored.lock_acquired_by, None);
    assert_eq!(fixture.backup_operator.call_count("trigger_backup"), 1);
}

#[tokio::test]
async fn backup_requires_a_hibernated_installation() {
    let fixture = Fixture::new();
    let cluster = fixture.seed_cluster().await;
    let installation = fixture.seed_installation(InstallationState::Stable).await;
    fixture.seed_child(&installation, &cluster, ClusterInstallationState::Stable).await;
    let backup = fixture
        .store
        .create_installation_backup(
            InstallationBackup::builder().installation_id(installation.id.clone()).build(),
        )
        .await
        .unwrap();

    fixture.backup_supervisor().supervise(&backup).await;

    assert_eq!(backup_state(&fixture, &backup).await, InstallationBackupState::Requested);
    assert_eq!(fixture.backup_operator.call_count("trigger_backup"), 0);
}

#[tokio::test]
async fn backup_requires_a_stable_cluster_installation() {
    let fixture = Fixture::new();
    let cluster = fixture.seed_cluster().await;
    let installation = fixture.seed_installation(InstallationState::Hibernating).await;
    fixture
        .seed_child(&installation, &cluster, ClusterInstallationState::Reconciling)
        .await;
    let backup = fixture
        .store
        .create_installation_backup(
            InstallationBackup::builder().installation_id(installation.id.clone()).build(),
        )
        .await
        .unwrap();

    fixture.backup_supervisor().supervise(&backup).await;

    assert_eq!(backup_state(&fixture, &backup).await, InstallationBackupState::Requested);
}

#[tokio::test]
async fn backup_for_a_deleted_installation_fails() {
    let fixture = Fixture::new();
    let seeded = seed(&fixture).await;
    fixture.store.delete_installation(&seeded.backup.installation_id).await.unwrap();

    fixture.backup_supervisor().supervise(&seeded.backup).await;

    assert_eq!(backup_state(&fixture, &seeded.backup).await, InstallationBackupState::Failed);
}

#[tokio::test]
async fn in_progress_backup_finishes_when_the_job_reports_a_start_time() {
    let fixture = Fixture::new();
    let seeded = seed(&fixture).await;
    let supervisor = fixture.backup_supervisor();
    supervisor.supervise(&seeded.backup).await;
    let in_progress =
        fixture.store.get_installation_backup(&seeded.backup.id).await.unwrap().unwrap();

    // Still running.
    supervisor.supervise(&in_progress).await;
    assert_eq!(
        backup_state(&fixture, &seeded.backup).await,
        InstallationBackupState::InProgress
    );

    fixture.backup_operator.set_status(Some(1_000_500));
    supervisor.supervise(&in_progress).await;
    let stored =
        fixture.store.get_installation_backup(&seeded.backup.id).await.unwrap().unwrap();
    assert_eq!(stored.state, InstallationBackupState::Succeeded);
    assert_eq!(stored.start_at, 1_000_500);
}

#[tokio::test]
async fn backoff_limit_fails_the_backup() {
    let fixture = Fixture::new();
    let seeded = seed(&fixture).await;
    let supervisor = fixture.backup_supervisor();
    supervisor.supervise(&seeded.backup).await;
    let in_progress =
        fixture.store.get_installation_backup(&seeded.backup.id).await.unwrap().unwrap();

    fixture.backup_operator.fail_with("check_backup_status", true, "backoff limit reached");
    supervisor.supervise(&in_progress).await;
    assert_eq!(backup_state(&fixture, &seeded.backup).await, InstallationBackupState::Failed);
}

#[tokio::test]
async fn transient_status_errors_keep_the_backup_running() {
    let fixture = Fixture::new();
    let seeded = seed(&fixture).await;
    let supervisor = fixture.backup_supervisor();
    supervisor.supervise(&seeded.backup).await;
    let in_progress =
        fixture.store.get_installation_backup(&seeded.backup.id).await.unwrap().unwrap();

    fixture.backup_operator.fail_with("check_backup_status", false, "job api flake");
    supervisor.supervise(&in_progress).await;
    assert_eq!(
        backup_state(&fixture, &seeded.backup).await,
        InstallationBackupState::InProgress
    );
}

#[tokio::test]
async fn deletion_cleans_up_and_soft_deletes() {
    let fixture = Fixture::new();
    let seeded = seed(&fixture).await;
    let supervisor = fixture.backup_supervisor();
    supervisor.supervise(&seeded.backup).await;
    fixture
        .store
        .update_installation_backup_state(
            &seeded.backup.id,
            InstallationBackupState::DeletionRequested,
        )
        .await
        .unwrap();
    let mut observed =
        fixture.store.get_installation_backup(&seeded.backup.id).await.unwrap().unwrap();
    observed.state = InstallationBackupState::DeletionRequested;

    supervisor.supervise(&observed).await;

    let stored =
        fixture.store.get_installation_backup(&seeded.backup.id).await.unwrap().unwrap();
    assert_eq!(stored.state, InstallationBackupState::Deleted);
    assert!(stored.is_deleted());
    assert_eq!(fixture.backup_operator.call_count("cleanup_backup"), 1);
}

#[tokio::test]
async fn transitions_land_in_the_audit_trail() {
    let fixture = Fixture::new();
    let seeded = seed(&fixture).await;

    fixture.backup_supervisor().supervise(&seeded.backup).await;

    let trail = fixture
        .store
        .get_state_changes(ResourceType::InstallationBackup, seeded.backup.id.as_str())
        .await
        .unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].old_state, "backup-requested");
    assert_eq!(trail[0].new_state, "backup-in-progress");
}
