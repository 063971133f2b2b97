// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster store operations.
//!
//! Clusters are created and reconciled outside the engine; placement only
//! reads them and, when a candidate needs out-of-band growth, writes
//! `resize-requested` back for the external cluster supervisor to pick up.

use crate::error::StoreError;
use async_trait::async_trait;
use gantry_core::{Cluster, ClusterId, ClusterState};

/// Store operations on clusters.
#[async_trait]
pub trait ClusterStore: Send + Sync {
    async fn get_cluster(&self, id: &ClusterId) -> Result<Option<Cluster>, StoreError>;

    /// All non-deleted clusters.
    async fn get_clusters(&self) -> Result<Vec<Cluster>, StoreError>;

    async fn create_cluster(&self, cluster: Cluster) -> Result<Cluster, StoreError>;

    async fn update_cluster_state(
        &self,
        id: &ClusterId,
        state: ClusterState,
    ) -> Result<(), StoreError>;
}
