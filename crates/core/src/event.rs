// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State-change audit events.
//!
//! Every committed state transition appends one event row. The trail is the
//! user-visible audit log and the deletion supervisor's source of truth for
//! how long an installation has sat in `deletion-pending`.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a state-change event.
    pub struct StateChangeEventId("evt-");
}

/// Which entity class an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Cluster,
    Installation,
    ClusterInstallation,
    Group,
    InstallationBackup,
    InstallationDbRestoration,
    InstallationDbMigration,
}

crate::state_strings! {
    ResourceType {
        Cluster => "cluster",
        Installation => "installation",
        ClusterInstallation => "cluster-installation",
        Group => "group",
        InstallationBackup => "installation-backup",
        InstallationDbRestoration => "installation-db-restoration",
        InstallationDbMigration => "installation-db-migration",
    }
}

/// One committed state transition of one resource.
///
/// States are recorded as their wire strings so a single trail covers every
/// entity class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateChangeEvent {
    pub id: StateChangeEventId,
    pub resource_type: ResourceType,
    pub resource_id: String,
    pub old_state: String,
    pub new_state: String,
    pub timestamp: u64,
}

crate::builder! {
    pub struct StateChangeEventBuilder => StateChangeEvent {
        into {
            resource_id: String = "ins-test",
            old_state: String = "stable",
            new_state: String = "update-requested",
        }
        set {
            resource_type: ResourceType = ResourceType::Installation,
            timestamp: u64 = 0,
        }
        computed {
            id: StateChangeEventId = StateChangeEventId::new(),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
