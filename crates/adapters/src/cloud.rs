// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cloud-provider client: DNS, object-store data lifecycle, secrets, tags.
//!
//! Only the operations the reconciliation engine consumes are modeled here.
//! VPC, managed-cluster, and CIDR operations belong to the external cluster
//! supervisor.

use async_trait::async_trait;
use gantry_core::Installation;
use thiserror::Error;

/// Failure reported by a cloud-provider call. Always treated as transient.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("cloud provider failure: {0}")]
    Provider(String),
}

/// Cloud-provider operations consumed by the engine.
#[async_trait]
pub trait CloudClient: Send + Sync {
    /// Create or update the installation's public DNS record pointing at the
    /// given load-balancer endpoint.
    async fn upsert_public_dns(
        &self,
        installation: &Installation,
        endpoint: &str,
    ) -> Result<(), CloudError>;

    /// Remove the installation's public DNS records.
    async fn delete_public_dns(&self, installation: &Installation) -> Result<(), CloudError>;

    /// Tear down the installation's externally managed database resources.
    async fn delete_installation_database(
        &self,
        installation: &Installation,
    ) -> Result<(), CloudError>;

    /// Delete the installation's object-store data (filestore contents,
    /// exported artifacts).
    async fn delete_installation_filestore(
        &self,
        installation: &Installation,
    ) -> Result<(), CloudError>;

    /// Fetch a named secret. `None` when the secret does not exist yet.
    async fn fetch_secret(&self, name: &str) -> Result<Option<String>, CloudError>;

    /// Release cloud resource tags held on the installation's behalf.
    async fn release_resource_tags(&self, installation: &Installation) -> Result<(), CloudError>;
}
