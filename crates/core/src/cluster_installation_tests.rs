// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn state_wire_strings_round_trip() {
    for state in ClusterInstallationState::ALL {
        assert_eq!(ClusterInstallationState::parse(state.as_str()), Some(*state));
    }
}

#[parameterized(
    creation_requested = { ClusterInstallationState::CreationRequested, true },
    reconciling = { ClusterInstallationState::Reconciling, true },
    deletion_requested = { ClusterInstallationState::DeletionRequested, true },
    ready = { ClusterInstallationState::Ready, false },
    stable = { ClusterInstallationState::Stable, false },
    creation_failed = { ClusterInstallationState::CreationFailed, false },
    deletion_failed = { ClusterInstallationState::DeletionFailed, false },
    deleted = { ClusterInstallationState::Deleted, false },
)]
fn pending_work_membership(state: ClusterInstallationState, pending: bool) {
    assert_eq!(state.pending_work(), pending);
}

#[test]
fn builder_links_parent_ids() {
    let installation_id = InstallationId::from_string("ins-parent");
    let cluster_id = ClusterId::from_string("cls-target");
    let ci = ClusterInstallation::builder()
        .installation_id(installation_id.clone())
        .cluster_id(cluster_id.clone())
        .build();
    assert_eq!(ci.installation_id, installation_id);
    assert_eq!(ci.cluster_id, cluster_id);
}
