// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::group::Group;
use yare::parameterized;

#[test]
fn state_wire_strings_round_trip() {
    for state in InstallationState::ALL {
        assert_eq!(InstallationState::parse(state.as_str()), Some(*state));
    }
}

#[test]
fn unknown_state_string_does_not_parse() {
    assert_eq!(InstallationState::parse("definitely-not-a-state"), None);
}

#[parameterized(
    creation_requested = { InstallationState::CreationRequested, true },
    no_compatible = { InstallationState::CreationNoCompatibleClusters, true },
    creation_dns = { InstallationState::CreationDns, true },
    update_requested = { InstallationState::UpdateRequested, true },
    wake_up = { InstallationState::WakeUpRequested, true },
    deletion_final_cleanup = { InstallationState::DeletionFinalCleanup, true },
    stable = { InstallationState::Stable, false },
    hibernating = { InstallationState::Hibernating, false },
    deletion_pending = { InstallationState::DeletionPending, false },
    creation_failed = { InstallationState::CreationFailed, false },
    deleted = { InstallationState::Deleted, false },
    db_restoration = { InstallationState::DbRestorationInProgress, false },
    db_migration = { InstallationState::DbMigrationInProgress, false },
)]
fn pending_work_membership(state: InstallationState, pending: bool) {
    assert_eq!(state.pending_work(), pending);
}

#[test]
fn pending_work_set_has_seventeen_states() {
    let count = InstallationState::ALL.iter().filter(|s| s.pending_work()).count();
    assert_eq!(count, 17);
}

#[test]
fn merge_group_config_adopts_version_image_and_sequence() {
    let group = Group::builder().version("9.9.9").image("gantry/app-next").sequence(7).build();
    let mut installation = Installation::builder()
        .group_id(group.id.clone())
        .group_sequence(3u64)
        .build();

    assert!(!installation.up_to_date_with(&group));
    installation.merge_group_config(&group);

    assert_eq!(installation.version, "9.9.9");
    assert_eq!(installation.image, "gantry/app-next");
    assert!(installation.up_to_date_with(&group));
}

#[test]
fn installation_without_sequence_is_never_up_to_date() {
    let group = Group::builder().sequence(0).build();
    let installation = Installation::builder().group_id(group.id.clone()).build();
    assert_eq!(installation.group_sequence, None);
    assert!(!installation.up_to_date_with(&group));
}

#[parameterized(
    small_medium = { Size::Small, Size::Medium },
    medium_large = { Size::Medium, Size::Large },
)]
fn sizes_are_strictly_ordered(smaller: Size, larger: Size) {
    let a = smaller.resource_request();
    let b = larger.resource_request();
    assert!(a.milli_cpu < b.milli_cpu);
    assert!(a.milli_memory < b.milli_memory);
    assert!(a.pods < b.pods);
}

#[test]
fn entity_serde_uses_wire_strings() {
    let installation = Installation::builder()
        .state(InstallationState::CreationNoCompatibleClusters)
        .affinity(Affinity::Isolated)
        .build();
    let json = serde_json::to_value(&installation).unwrap();
    assert_eq!(json["state"], "creation-no-compatible-clusters");
    assert_eq!(json["affinity"], "isolated");
    assert_eq!(json["size"], "small");
}

#[test]
fn soft_deletion_flag() {
    let mut installation = Installation::builder().build();
    assert!(!installation.is_deleted());
    installation.delete_at = 12345;
    assert!(installation.is_deleted());
}
