// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gantry_core::ClusterInstallationState as CiState;

#[tokio::test]
async fn fake_provisioner_scripts_failures_per_method() {
    let provisioner = FakeProvisioner::new();
    let cluster = Cluster::builder().build();
    let installation = Installation::builder().build();
    let ci = ClusterInstallation::builder().build();

    provisioner.fail_with("create_cluster_installation", false, "apiserver flake");
    let err = provisioner
        .create_cluster_installation(&cluster, &installation, &ci)
        .await
        .unwrap_err();
    assert!(!err.is_terminal());

    provisioner.fail_with("create_cluster_installation", true, "invalid spec");
    let err = provisioner
        .create_cluster_installation(&cluster, &installation, &ci)
        .await
        .unwrap_err();
    assert!(err.is_terminal());

    provisioner.clear_failure("create_cluster_installation");
    provisioner
        .create_cluster_installation(&cluster, &installation, &ci)
        .await
        .unwrap();

    assert_eq!(provisioner.call_count("create_cluster_installation"), 3);
    // Other methods are unaffected by the script.
    assert!(provisioner
        .is_resource_ready_and_stable(&cluster, &ci)
        .await
        .unwrap()
        .stable);
}

#[tokio::test]
async fn backup_operator_maps_terminal_to_backoff_limit() {
    let operator = FakeBackupOperator::new();
    let backup = InstallationBackup::builder().build();
    let cluster = Cluster::builder().build();

    operator.fail_with("check_backup_status", true, "too many retries");
    let err = operator.check_backup_status(&backup, &cluster).await.unwrap_err();
    assert!(matches!(err, OperatorError::BackoffLimitReached(_)));
    assert!(err.is_terminal());

    operator.clear_failure("check_backup_status");
    assert_eq!(operator.check_backup_status(&backup, &cluster).await.unwrap(), None);
    operator.set_status(Some(1234));
    assert_eq!(operator.check_backup_status(&backup, &cluster).await.unwrap(), Some(1234));
}

#[tokio::test]
async fn trigger_backup_names_the_residence_after_the_backup() {
    let operator = FakeBackupOperator::new();
    let backup = InstallationBackup::builder().build();
    let installation = Installation::builder().build();
    let cluster = Cluster::builder().build();

    let residence = operator.trigger_backup(&backup, &installation, &cluster).await.unwrap();
    assert_eq!(residence.path, backup.id.as_str());
}

#[tokio::test]
async fn recording_producer_captures_and_can_fail() {
    let producer = RecordingEventProducer::new();
    let mut ci = ClusterInstallation::builder().state(CiState::Stable).build();

    producer
        .cluster_installation_state_change(&ci, CiState::Reconciling)
        .await
        .unwrap();
    assert_eq!(producer.events().len(), 1);
    assert_eq!(producer.events()[0].old_state, "reconciling");
    assert_eq!(producer.events()[0].new_state, "stable");

    producer.set_failing(true);
    ci.state = CiState::DeletionRequested;
    assert!(producer
        .cluster_installation_state_change(&ci, CiState::Stable)
        .await
        .is_err());
    assert_eq!(producer.events().len(), 1);
}
