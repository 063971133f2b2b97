// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State-change event trail operations.

use crate::error::StoreError;
use async_trait::async_trait;
use gantry_core::{ResourceType, StateChangeEvent};

/// Append-only access to the state-change audit trail.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append one committed transition.
    async fn record_state_change(&self, event: StateChangeEvent) -> Result<(), StoreError>;

    /// The most recent event that moved the given resource into `new_state`.
    async fn get_latest_state_change(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
        new_state: &str,
    ) -> Result<Option<StateChangeEvent>, StoreError>;

    /// Every event for one resource, oldest first.
    async fn get_state_changes(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
    ) -> Result<Vec<StateChangeEvent>, StoreError>;
}
