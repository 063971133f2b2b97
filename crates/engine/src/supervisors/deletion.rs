// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Installation-deletion supervisor.
//!
//! Two timers in one doer: `stable` installations whose scheduled deletion
//! time has passed enter the deletion-pending pipeline (unless deletion is
//! locked), and `deletion-pending` installations whose grace period elapsed
//! move on to real deletion. A fleet-wide cap on concurrently updating
//! installations keeps mass expiries from stampeding the fleet.

use crate::doer::Doer;
use crate::error::EngineError;
use crate::options::DeletionSupervisorOptions;
use crate::{events, lock};
use async_trait::async_trait;
use gantry_adapters::EventProducer;
use gantry_core::{Clock, Installation, InstallationState, ResourceType, SystemClock};
use gantry_store::{EventStore, InstallationFilter, InstallationStore};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Store surface the deletion supervisor needs.
pub trait DeletionSupervisorStore: InstallationStore + EventStore {}

impl<T> DeletionSupervisorStore for T where T: InstallationStore + EventStore {}

/// Supervisor enforcing scheduled deletions and the deletion-pending grace
/// period.
pub struct InstallationDeletionSupervisor<S, C = SystemClock> {
    store: Arc<S>,
    producer: Arc<dyn EventProducer>,
    instance_id: String,
    options: DeletionSupervisorOptions,
    clock: C,
}

impl<S, C> InstallationDeletionSupervisor<S, C>
where
    S: DeletionSupervisorStore,
    C: Clock,
{
    pub fn new(
        store: Arc<S>,
        producer: Arc<dyn EventProducer>,
        instance_id: impl Into<String>,
        options: DeletionSupervisorOptions,
        clock: C,
    ) -> Self {
        Self { store, producer, instance_id: instance_id.into(), options, clock }
    }

    async fn sweep(&self) -> Result<(), EngineError> {
        let status = self.store.get_installations_status().await?;
        if status.updating >= self.options.currently_updating_limit {
            info!(
                updating = status.updating,
                limit = self.options.currently_updating_limit,
                "too many installations updating, standing down"
            );
            return Ok(());
        }

        let now = self.clock.epoch_ms();

        // Scheduled deletions: stable installations whose timer has fired.
        let scheduled = self.store.get_unlocked_installations_with_scheduled_deletion().await?;
        for installation in &scheduled {
            if installation.state == InstallationState::Stable
                && installation.scheduled_deletion_time <= now
            {
                self.advance(
                    installation,
                    InstallationState::DeletionPendingRequested,
                    |current| {
                        current.state == InstallationState::Stable
                            && !current.deletion_locked
                            && current.scheduled_deletion_time > 0
                    },
                )
                .await;
            }
        }

        // Deletion-pending grace: explicit expiry wins; otherwise the age of
        // the most recent deletion-pending event decides.
        let filter = InstallationFilter {
            states: vec![InstallationState::DeletionPending],
            ..Default::default()
        };
        let pending = self.store.get_installations(&filter).await?;
        for installation in &pending {
            if self.grace_elapsed(installation, now).await {
                self.advance(installation, InstallationState::DeletionRequested, |current| {
                    current.state == InstallationState::DeletionPending
                })
                .await;
            }
        }
        Ok(())
    }

    async fn grace_elapsed(&self, installation: &Installation, now: u64) -> bool {
        if installation.deletion_pending_expiry > 0 {
            return now >= installation.deletion_pending_expiry;
        }
        let event = match self
            .store
            .get_latest_state_change(
                ResourceType::Installation,
                installation.id.as_str(),
                InstallationState::DeletionPending.as_str(),
            )
            .await
        {
            Ok(event) => event,
            Err(error) => {
                warn!(installation_id = %installation.id, %error, "failed to read event trail");
                return false;
            }
        };
        match event {
            Some(event) => {
                now.saturating_sub(event.timestamp)
                    >= self.options.deletion_pending_time.as_millis() as u64
            }
            None => {
                // No recorded entry into deletion-pending; without a baseline
                // the grace period cannot be measured, so wait.
                debug!(installation_id = %installation.id, "no deletion-pending event recorded");
                false
            }
        }
    }

    /// Lock, re-verify with `still_eligible`, and commit the transition.
    async fn advance<F>(
        &self,
        observed: &Installation,
        new_state: InstallationState,
        still_eligible: F,
    ) where
        F: Fn(&Installation) -> bool,
    {
        let id = observed.id.clone();
        if !lock::acquire(
            self.store.lock_installation(&id, &self.instance_id),
            "installation",
            id.as_str(),
        )
        .await
        {
            return;
        }
        self.advance_locked(observed, new_state, still_eligible).await;
        lock::release(
            self.store.unlock_installation(&id, &self.instance_id, false),
            "installation",
            id.as_str(),
        )
        .await;
    }

    async fn advance_locked<F>(
        &self,
        observed: &Installation,
        new_state: InstallationState,
        still_eligible: F,
    ) where
        F: Fn(&Installation) -> bool,
    {
        let installation = match self.store.get_installation(&observed.id).await {
            Ok(Some(installation)) => installation,
            Ok(None) => {
                warn!(installation_id = %observed.id, "installation disappeared before supervision");
                return;
            }
            Err(error) => {
                warn!(installation_id = %observed.id, %error, "failed to reload installation");
                return;
            }
        };
        if !still_eligible(&installation) {
            debug!(installation_id = %installation.id, "no longer eligible, yielding");
            return;
        }

        if let Err(error) =
            self.store.update_installation_state(&installation.id, new_state).await
        {
            warn!(installation_id = %installation.id, %error, "failed to persist new state");
            return;
        }
        events::record_transition(
            self.store.as_ref(),
            ResourceType::Installation,
            installation.id.as_str(),
            installation.state.as_str(),
            new_state.as_str(),
            self.clock.epoch_ms(),
        )
        .await;
        let mut updated = installation.clone();
        updated.state = new_state;
        events::notify_installation(self.producer.as_ref(), &updated, installation.state).await;
    }
}

#[async_trait]
impl<S, C> Doer for InstallationDeletionSupervisor<S, C>
where
    S: DeletionSupervisorStore + 'static,
    C: Clock,
{
    async fn run(&self) -> Result<(), EngineError> {
        self.sweep().await
    }

    fn name(&self) -> &'static str {
        "installation-deletion-supervisor"
    }
}

#[cfg(test)]
#[path = "deletion_tests.rs"]
mod tests;
