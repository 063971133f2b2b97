// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transition commit helpers.
//!
//! A committed transition appends one row to the audit trail and, for the
//! externally visible entity classes, one producer notification. Both are
//! best-effort: a failure is logged and never rolls back the state change
//! already persisted to the store (§7).

use gantry_adapters::EventProducer;
use gantry_core::{
    Cluster, ClusterInstallation, ClusterInstallationState, ClusterState, Installation,
    InstallationState, ResourceType, StateChangeEvent, StateChangeEventId,
};
use gantry_store::EventStore;
use tracing::{info, warn};

/// Append one transition to the audit trail.
pub(crate) async fn record_transition<S>(
    store: &S,
    resource_type: ResourceType,
    resource_id: &str,
    old_state: &str,
    new_state: &str,
    timestamp: u64,
) where
    S: EventStore + ?Sized,
{
    info!(resource = resource_type.as_str(), resource_id, old_state, new_state, "state changed");
    let event = StateChangeEvent {
        id: StateChangeEventId::new(),
        resource_type,
        resource_id: resource_id.to_string(),
        old_state: old_state.to_string(),
        new_state: new_state.to_string(),
        timestamp,
    };
    if let Err(error) = store.record_state_change(event).await {
        warn!(resource_id, %error, "failed to record state-change event");
    }
}

/// Notify the producer of an installation transition; log-and-continue.
pub(crate) async fn notify_installation<P>(
    producer: &P,
    installation: &Installation,
    old_state: InstallationState,
) where
    P: EventProducer + ?Sized,
{
    if let Err(error) = producer.installation_state_change(installation, old_state).await {
        warn!(installation_id = %installation.id, %error, "event producer failed");
    }
}

/// Notify the producer of a cluster-installation transition.
pub(crate) async fn notify_cluster_installation<P>(
    producer: &P,
    cluster_installation: &ClusterInstallation,
    old_state: ClusterInstallationState,
) where
    P: EventProducer + ?Sized,
{
    if let Err(error) = producer
        .cluster_installation_state_change(cluster_installation, old_state)
        .await
    {
        warn!(cluster_installation_id = %cluster_installation.id, %error, "event producer failed");
    }
}

/// Notify the producer of a cluster transition.
pub(crate) async fn notify_cluster<P>(producer: &P, cluster: &Cluster, old_state: ClusterState)
where
    P: EventProducer + ?Sized,
{
    if let Err(error) = producer.cluster_state_change(cluster, old_state).await {
        warn!(cluster_id = %cluster.id, %error, "event producer failed");
    }
}
