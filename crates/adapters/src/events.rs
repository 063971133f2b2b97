// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State-change notification producer.
//!
//! Supervisors call the producer after a transition has been committed to
//! the store. Delivery failures are logged and swallowed by the caller;
//! they never roll back the committed state (§7).

use async_trait::async_trait;
use gantry_core::{
    Cluster, ClusterInstallation, ClusterInstallationState, ClusterState, Installation,
    InstallationState,
};
use thiserror::Error;

/// Failure reported by the notification pipeline.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("event delivery failure: {0}")]
    Delivery(String),
}

/// Emits resource state-change notifications to external consumers.
#[async_trait]
pub trait EventProducer: Send + Sync {
    async fn installation_state_change(
        &self,
        installation: &Installation,
        old_state: InstallationState,
    ) -> Result<(), EventError>;

    async fn cluster_installation_state_change(
        &self,
        cluster_installation: &ClusterInstallation,
        old_state: ClusterInstallationState,
    ) -> Result<(), EventError>;

    async fn cluster_state_change(
        &self,
        cluster: &Cluster,
        old_state: ClusterState,
    ) -> Result<(), EventError>;
}
