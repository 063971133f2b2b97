// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster selection for new installations (§4.3.1).
//!
//! Candidates must allow installations, be `stable`, and offer every
//! annotation the installation requires. Each surviving candidate's resource
//! report is checked per dimension with the installation's projected request
//! added on top; a candidate pushed over a threshold is either dropped or,
//! when a scale value is configured, kept and asked out of band to grow by
//! moving the cluster to `resize-requested`.

use crate::events;
use crate::options::SchedulingOptions;
use gantry_adapters::{
    ClusterResources, EventProducer, Provisioner, ProvisionerError,
};
use gantry_core::{
    Affinity, Cluster, ClusterState, Installation, ResourceRequest, ResourceType,
};
use gantry_store::{ClusterStore, EventStore, InstallationStore, StoreError};
use thiserror::Error;
use tracing::{debug, warn};

/// Failure during candidate evaluation; always treated as transient by the
/// caller.
#[derive(Debug, Error)]
pub(crate) enum PlacementError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Provisioner(#[from] ProvisionerError),
}

struct Candidate {
    cluster: Cluster,
    hosted: u64,
    hosts_same_group: bool,
}

/// Select the cluster a new installation should be realized on.
///
/// `Ok(None)` means no compatible cluster exists right now; the caller maps
/// that to `creation-no-compatible-clusters` and retries later.
pub(crate) async fn select_cluster_for_installation<S>(
    store: &S,
    provisioner: &dyn Provisioner,
    producer: &dyn EventProducer,
    options: &SchedulingOptions,
    now: u64,
    installation: &Installation,
) -> Result<Option<Cluster>, PlacementError>
where
    S: ClusterStore + InstallationStore + EventStore + ?Sized,
{
    let mut candidates = Vec::new();

    for cluster in store.get_clusters().await? {
        if !cluster.schedulable() || !cluster.satisfies_annotations(&installation.annotations) {
            continue;
        }

        let hosted: Vec<Installation> = store
            .get_installations_for_cluster(&cluster.id)
            .await?
            .into_iter()
            .filter(|i| i.id != installation.id)
            .collect();

        if installation.affinity == Affinity::Isolated && !hosted.is_empty() {
            continue;
        }

        let resources = provisioner.get_cluster_resources(&cluster).await?;
        if let Some(dimension) =
            dimension_over_threshold(&resources, &installation.resource_request(), options)
        {
            if options.cluster_resource_threshold_scale_value == 0 {
                debug!(
                    cluster_id = %cluster.id,
                    dimension,
                    "candidate over resource threshold, dropping"
                );
                continue;
            }
            request_resize(store, producer, &cluster, now).await;
        }

        let hosts_same_group = installation.group_id.is_some()
            && hosted.iter().any(|i| {
                i.affinity == Affinity::MultiTenant && i.group_id == installation.group_id
            });

        candidates.push(Candidate { hosted: hosted.len() as u64, hosts_same_group, cluster });
    }

    if candidates.is_empty() {
        return Ok(None);
    }

    // Multi-tenant installations prefer clusters already hosting their
    // group; any candidate remains eligible when no such cluster exists.
    if installation.affinity == Affinity::MultiTenant
        && candidates.iter().any(|c| c.hosts_same_group)
    {
        candidates.retain(|c| c.hosts_same_group);
    }

    if options.balance_installations {
        candidates.sort_by(|a, b| {
            a.hosted.cmp(&b.hosted).then_with(|| a.cluster.id.cmp(&b.cluster.id))
        });
    } else {
        candidates.sort_by(|a, b| {
            a.cluster
                .create_at
                .cmp(&b.cluster.create_at)
                .then_with(|| a.cluster.id.cmp(&b.cluster.id))
        });
    }

    Ok(Some(candidates.remove(0).cluster))
}

/// Returns the first dimension the projected request pushes to or past its
/// threshold, if any. A zero-capacity dimension always trips.
fn dimension_over_threshold(
    resources: &ClusterResources,
    request: &ResourceRequest,
    options: &SchedulingOptions,
) -> Option<&'static str> {
    let checks = [
        (
            "cpu",
            resources.milli_used_cpu,
            request.milli_cpu,
            resources.milli_total_cpu,
            options.cluster_resource_threshold_cpu,
        ),
        (
            "memory",
            resources.milli_used_memory,
            request.milli_memory,
            resources.milli_total_memory,
            options.cluster_resource_threshold_memory,
        ),
        (
            "pod-count",
            resources.used_pod_count,
            request.pods,
            resources.total_pod_count,
            options.cluster_resource_threshold_pod_count,
        ),
    ];

    for (dimension, used, add, total, threshold) in checks {
        if total == 0 || (used + add) * 100 >= total * threshold {
            return Some(dimension);
        }
    }
    None
}

/// Ask the external cluster supervisor, out of band, to grow a cluster that
/// placement wants to keep using.
async fn request_resize<S>(store: &S, producer: &dyn EventProducer, cluster: &Cluster, now: u64)
where
    S: ClusterStore + EventStore + ?Sized,
{
    if let Err(error) = store.update_cluster_state(&cluster.id, ClusterState::ResizeRequested).await
    {
        warn!(cluster_id = %cluster.id, %error, "failed to request cluster resize");
        return;
    }
    events::record_transition(
        store,
        ResourceType::Cluster,
        cluster.id.as_str(),
        cluster.state.as_str(),
        ClusterState::ResizeRequested.as_str(),
        now,
    )
    .await;
    let mut resized = cluster.clone();
    resized.state = ClusterState::ResizeRequested;
    events::notify_cluster(producer, &resized, cluster.state).await;
}

#[cfg(test)]
#[path = "placement_tests.rs"]
mod tests;
