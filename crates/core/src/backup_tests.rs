// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn state_wire_strings_round_trip() {
    for state in InstallationBackupState::ALL {
        assert_eq!(InstallationBackupState::parse(state.as_str()), Some(*state));
    }
}

#[parameterized(
    requested = { InstallationBackupState::Requested, true, true },
    in_progress = { InstallationBackupState::InProgress, true, true },
    succeeded = { InstallationBackupState::Succeeded, false, false },
    failed = { InstallationBackupState::Failed, false, false },
    deletion_requested = { InstallationBackupState::DeletionRequested, true, false },
    deleted = { InstallationBackupState::Deleted, false, false },
)]
fn pending_and_running_membership(state: InstallationBackupState, pending: bool, running: bool) {
    assert_eq!(state.pending_work(), pending);
    assert_eq!(state.running(), running);
}

#[test]
fn backup_states_use_prefixed_wire_strings() {
    assert_eq!(InstallationBackupState::Requested.as_str(), "backup-requested");
    assert_eq!(InstallationBackupState::Succeeded.as_str(), "backup-succeeded");
}
