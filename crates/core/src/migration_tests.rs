// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn state_wire_strings_round_trip() {
    for state in MigrationState::ALL {
        assert_eq!(MigrationState::parse(state.as_str()), Some(*state));
    }
}

#[test]
fn only_terminal_states_are_not_pending() {
    for state in MigrationState::ALL {
        let terminal = matches!(*state, MigrationState::Succeeded | MigrationState::Failed);
        assert_eq!(state.pending_work(), !terminal, "state {state}");
    }
}

#[test]
fn new_migrations_have_no_legs() {
    let migration = InstallationDbMigrationOperation::builder().build();
    assert_eq!(migration.backup_id, None);
    assert_eq!(migration.restoration_id, None);
}
