// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gantry-engine: the reconciliation engine.
//!
//! A set of supervisors, one per resource class, each advancing its
//! resources through a state machine until they reach a terminal state.
//! Every supervisor is a [`Doer`] driven by its own [`Scheduler`]; multiple
//! control-plane processes coordinate purely through the store's per-row
//! advisory locks, keyed by each process's `instance_id`.
//!
//! The supervisors share one cycle shape: scan for unlocked pending work,
//! lock one row, reload it, compute the next state, reload again, persist,
//! append an audit event, notify the producer, unlock. Any step that fails
//! transiently leaves the state alone; the next cycle retries.

pub mod doer;
pub mod error;
pub mod options;
pub mod scheduler;
pub mod supervisors;

pub(crate) mod events;
pub(crate) mod lock;
pub(crate) mod placement;

pub use doer::{Doer, MultiDoer};
pub use error::EngineError;
pub use options::{
    DeletionSupervisorOptions, InstallationSupervisorOptions, OptionsError, SchedulingOptions,
};
pub use scheduler::Scheduler;
pub use supervisors::backup::{BackupSupervisor, BackupSupervisorStore};
pub use supervisors::cluster_installation::{
    ClusterInstallationSupervisor, ClusterInstallationSupervisorStore,
};
pub use supervisors::deletion::{InstallationDeletionSupervisor, DeletionSupervisorStore};
pub use supervisors::group::{GroupSupervisor, GroupSupervisorStore};
pub use supervisors::installation::{InstallationSupervisor, InstallationSupervisorStore};
pub use supervisors::migration::{MigrationSupervisor, MigrationSupervisorStore};
pub use supervisors::restoration::{RestorationSupervisor, RestorationSupervisorStore};
