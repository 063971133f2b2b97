// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Group entity: shared configuration rolled out across member installations.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for an installation group.
    pub struct GroupId("grp-");
}

/// A named configuration (version/image) shared by a set of installations.
///
/// `sequence` increases monotonically whenever the group's configuration is
/// edited; the group supervisor rolls members forward until their
/// `group_sequence` matches it. Groups have no state machine of their own,
/// only the advisory lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub version: String,
    pub image: String,
    /// Upper bound on members concurrently rolling; 0 pauses the group.
    pub max_rolling: u64,
    /// Monotonic configuration revision.
    pub sequence: u64,
    pub create_at: u64,
    pub delete_at: u64,
    pub lock_acquired_by: Option<String>,
    pub lock_acquired_at: u64,
}

impl Group {
    pub fn is_deleted(&self) -> bool {
        self.delete_at > 0
    }

    pub fn is_paused(&self) -> bool {
        self.max_rolling == 0
    }
}

crate::builder! {
    pub struct GroupBuilder => Group {
        into {
            name: String = "test-group",
            version: String = "2.0.0",
            image: String = "gantry/app",
        }
        set {
            max_rolling: u64 = 1,
            sequence: u64 = 1,
            create_at: u64 = 0,
            delete_at: u64 = 0,
            lock_acquired_at: u64 = 0,
        }
        option {
            lock_acquired_by: String = None,
        }
        computed {
            id: GroupId = GroupId::new(),
        }
    }
}

#[cfg(test)]
#[path = "group_tests.rs"]
mod tests;
