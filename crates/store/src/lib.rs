// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gantry-store: the store surface consumed by the reconciliation engine.
//!
//! The engine never talks to a database directly; it talks to the per-entity
//! traits defined here. Each supervisor declares the minimal union of traits
//! it needs, so tests substitute stubs and the production store implements
//! the whole set. Advisory row locks follow the shared protocol: `lock`
//! returns `Ok(false)` when the row is already held (not an error), and
//! readers never block.
//!
//! [`MemoryStore`] (behind the `test-support` feature) implements every
//! trait over a single in-process state bag.

pub mod backups;
pub mod cluster_installations;
pub mod clusters;
pub mod error;
pub mod events;
pub mod groups;
pub mod installations;
pub mod migrations;
pub mod restorations;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use backups::{BackupFilter, BackupStore};
pub use cluster_installations::{ClusterInstallationFilter, ClusterInstallationStore};
pub use clusters::ClusterStore;
pub use error::StoreError;
pub use events::EventStore;
pub use groups::{GroupRollingMetadata, GroupStore};
pub use installations::{InstallationFilter, InstallationStore};
pub use migrations::MigrationStore;
pub use restorations::RestorationStore;

#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryStore;
