// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provisioner interface: applies, reads, and deletes workload resources on
//! a target cluster.
//!
//! One provisioner exists per custom-resource version; the registry maps an
//! installation's `cr_version` to the implementation that understands it.
//! New versions are registered explicitly at construction.

use async_trait::async_trait;
use gantry_core::{Cluster, ClusterInstallation, Installation};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a provisioner call.
///
/// The engine maps `Transient` to "retry next cycle, same state" and
/// `Terminal` to the resource's `-failed` state. The two must never be
/// collapsed (§7).
#[derive(Debug, Error)]
pub enum ProvisionerError {
    #[error("transient provisioner failure: {0}")]
    Transient(String),

    #[error("provisioner gave up: {0}")]
    Terminal(String),
}

impl ProvisionerError {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProvisionerError::Terminal(_))
    }
}

/// Resource usage report for one cluster.
///
/// `used` figures include everything currently scheduled, not just gantry
/// workloads. Placement adds the candidate installation's projected request
/// on top before comparing against the thresholds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterResources {
    pub milli_total_cpu: u64,
    pub milli_used_cpu: u64,
    pub milli_total_memory: u64,
    pub milli_used_memory: u64,
    pub total_pod_count: u64,
    pub used_pod_count: u64,
}

/// Readiness report for one cluster installation's workload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceState {
    /// The workload answers health checks.
    pub ready: bool,
    /// The workload has fully settled on the desired spec.
    pub stable: bool,
}

/// Applies, reads, and deletes workload resources for one CR version.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Create the workload resources for a new cluster installation.
    async fn create_cluster_installation(
        &self,
        cluster: &Cluster,
        installation: &Installation,
        cluster_installation: &ClusterInstallation,
    ) -> Result<(), ProvisionerError>;

    /// Idempotently apply the installation's desired spec to an existing
    /// cluster installation.
    async fn ensure_cluster_installation(
        &self,
        cluster: &Cluster,
        installation: &Installation,
        cluster_installation: &ClusterInstallation,
    ) -> Result<(), ProvisionerError>;

    /// Delete the workload resources. Returns `true` once everything is
    /// confirmed gone; `false` means deletion is still in flight.
    async fn delete_cluster_installation(
        &self,
        cluster: &Cluster,
        cluster_installation: &ClusterInstallation,
    ) -> Result<bool, ProvisionerError>;

    /// Scale the workload to zero without touching its data.
    async fn hibernate_cluster_installation(
        &self,
        cluster: &Cluster,
        installation: &Installation,
        cluster_installation: &ClusterInstallation,
    ) -> Result<(), ProvisionerError>;

    /// Point-in-time readiness of the workload.
    async fn is_resource_ready_and_stable(
        &self,
        cluster: &Cluster,
        cluster_installation: &ClusterInstallation,
    ) -> Result<ResourceState, ProvisionerError>;

    /// Whether the live custom resource matches the installation's desired
    /// configuration.
    async fn verify_matches_config(
        &self,
        cluster: &Cluster,
        installation: &Installation,
        cluster_installation: &ClusterInstallation,
    ) -> Result<bool, ProvisionerError>;

    /// Migrate the live custom resource to this provisioner's CR version.
    /// Returns `true` when the resource is at the target version.
    async fn ensure_cr_migrated(
        &self,
        cluster: &Cluster,
        installation: &Installation,
    ) -> Result<bool, ProvisionerError>;

    /// Rotate the workload's secrets after external credentials changed.
    async fn refresh_secrets(
        &self,
        cluster: &Cluster,
        installation: &Installation,
        cluster_installation: &ClusterInstallation,
    ) -> Result<(), ProvisionerError>;

    /// Make sure cluster-level utilities required by the installation exist.
    async fn prepare_cluster_utilities(
        &self,
        cluster: &Cluster,
        installation: &Installation,
    ) -> Result<(), ProvisionerError>;

    /// Remove license secrets no longer referenced by the installation.
    async fn delete_old_license_secrets(
        &self,
        cluster: &Cluster,
        installation: &Installation,
        cluster_installation: &ClusterInstallation,
    ) -> Result<(), ProvisionerError>;

    /// Current resource usage of the cluster.
    async fn get_cluster_resources(
        &self,
        cluster: &Cluster,
    ) -> Result<ClusterResources, ProvisionerError>;

    /// Public endpoint of the cluster's ingress load balancer.
    async fn get_public_load_balancer_endpoint(
        &self,
        cluster: &Cluster,
    ) -> Result<String, ProvisionerError>;
}

/// Explicit map of CR version to provisioner implementation.
#[derive(Default)]
pub struct ProvisionerRegistry {
    versions: HashMap<String, Arc<dyn Provisioner>>,
}

impl ProvisionerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provisioner for a CR version. Later registrations of the
    /// same version replace earlier ones.
    pub fn register(
        mut self,
        cr_version: impl Into<String>,
        provisioner: Arc<dyn Provisioner>,
    ) -> Self {
        self.versions.insert(cr_version.into(), provisioner);
        self
    }

    /// Look up the provisioner for a CR version.
    pub fn get(&self, cr_version: &str) -> Option<Arc<dyn Provisioner>> {
        self.versions.get(cr_version).cloned()
    }
}
