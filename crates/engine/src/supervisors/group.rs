// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Group supervisor: rolling configuration reconciliation across members.
//!
//! Members behind the group's `sequence` are nudged into `update-requested`
//! in random order, never exceeding `max_rolling` concurrently rolling
//! members. The shuffle avoids biasing rollouts toward earlier-created
//! installations; tests inject a seeded RNG.

use crate::doer::Doer;
use crate::error::EngineError;
use crate::{events, lock};
use async_trait::async_trait;
use gantry_adapters::EventProducer;
use gantry_core::{Clock, Group, InstallationId, InstallationState, ResourceType, SystemClock};
use gantry_store::{EventStore, GroupStore, InstallationStore};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Store surface the group supervisor needs.
pub trait GroupSupervisorStore: GroupStore + InstallationStore + EventStore {}

impl<T> GroupSupervisorStore for T where T: GroupStore + InstallationStore + EventStore {}

/// Supervisor for [`Group`] rollouts.
pub struct GroupSupervisor<S, C = SystemClock> {
    store: Arc<S>,
    producer: Arc<dyn EventProducer>,
    instance_id: String,
    clock: C,
    rng: Mutex<StdRng>,
}

impl<S, C> GroupSupervisor<S, C>
where
    S: GroupSupervisorStore,
    C: Clock,
{
    pub fn new(
        store: Arc<S>,
        producer: Arc<dyn EventProducer>,
        instance_id: impl Into<String>,
        clock: C,
    ) -> Self {
        Self {
            store,
            producer,
            instance_id: instance_id.into(),
            clock,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Replace the rollout shuffle RNG with a seeded one.
    pub fn with_rng_seed(self, seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)), ..self }
    }

    /// Roll one group's out-of-date members, up to its rolling budget.
    pub async fn supervise(&self, observed: &Group) {
        let id = observed.id.clone();
        if !lock::acquire(self.store.lock_group(&id, &self.instance_id), "group", id.as_str())
            .await
        {
            return;
        }
        self.supervise_locked(observed).await;
        lock::release(
            self.store.unlock_group(&id, &self.instance_id, false),
            "group",
            id.as_str(),
        )
        .await;
    }

    async fn supervise_locked(&self, observed: &Group) {
        // Reload under the lock; the group's sequence or cap may have been
        // edited since the scan.
        let group = match self.store.get_group(&observed.id).await {
            Ok(Some(group)) => group,
            Ok(None) => {
                warn!(group_id = %observed.id, "group disappeared before supervision");
                return;
            }
            Err(error) => {
                warn!(group_id = %observed.id, %error, "failed to reload group");
                return;
            }
        };
        if group.is_paused() {
            info!(group_id = %group.id, "group rollout paused (max_rolling = 0)");
            return;
        }

        let metadata = match self.store.get_group_rolling_metadata(&group.id).await {
            Ok(metadata) => metadata,
            Err(error) => {
                warn!(group_id = %group.id, %error, "failed to load rolling metadata");
                return;
            }
        };
        if metadata.installations_rolling >= group.max_rolling {
            debug!(
                group_id = %group.id,
                rolling = metadata.installations_rolling,
                max_rolling = group.max_rolling,
                "rolling budget exhausted"
            );
            return;
        }

        let mut to_roll = metadata.ids_to_be_rolled;
        to_roll.shuffle(&mut *self.rng.lock());

        let budget = group.max_rolling - metadata.installations_rolling;
        let mut rolled = 0;
        for installation_id in &to_roll {
            if rolled >= budget {
                break;
            }
            if self.roll_member(&group, installation_id).await {
                rolled += 1;
            }
        }
        if rolled > 0 {
            info!(group_id = %group.id, rolled, "rolled group members");
        }
    }

    /// Move one member to `update-requested`. Returns whether it counted
    /// against the rolling budget.
    async fn roll_member(&self, group: &Group, installation_id: &InstallationId) -> bool {
        if !lock::acquire(
            self.store.lock_installation(installation_id, &self.instance_id),
            "installation",
            installation_id.as_str(),
        )
        .await
        {
            return false;
        }
        let rolled = self.roll_member_locked(group, installation_id).await;
        lock::release(
            self.store.unlock_installation(installation_id, &self.instance_id, false),
            "installation",
            installation_id.as_str(),
        )
        .await;
        rolled
    }

    async fn roll_member_locked(&self, group: &Group, installation_id: &InstallationId) -> bool {
        // Re-check under the lock; the member may have moved or caught up.
        let installation = match self.store.get_installation(installation_id).await {
            Ok(Some(installation)) => installation,
            Ok(None) => return false,
            Err(error) => {
                warn!(installation_id = %installation_id, %error, "failed to reload member");
                return false;
            }
        };
        if installation.state != InstallationState::Stable
            || installation.group_id.as_ref() != Some(&group.id)
            || installation.up_to_date_with(group)
        {
            return false;
        }

        if let Err(error) = self
            .store
            .update_installation_state(&installation.id, InstallationState::UpdateRequested)
            .await
        {
            warn!(installation_id = %installation.id, %error, "failed to request member update");
            return false;
        }
        events::record_transition(
            self.store.as_ref(),
            ResourceType::Installation,
            installation.id.as_str(),
            installation.state.as_str(),
            InstallationState::UpdateRequested.as_str(),
            self.clock.epoch_ms(),
        )
        .await;
        let mut updated = installation.clone();
        updated.state = InstallationState::UpdateRequested;
        events::notify_installation(self.producer.as_ref(), &updated, installation.state).await;
        true
    }
}

#[async_trait]
impl<S, C> Doer for GroupSupervisor<S, C>
where
    S: GroupSupervisorStore + 'static,
    C: Clock,
{
    async fn run(&self) -> Result<(), EngineError> {
        let groups = self.store.get_unlocked_groups_pending_work().await?;
        for group in &groups {
            self.supervise(group).await;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "group-supervisor"
    }
}

#[cfg(test)]
#[path = "group_tests.rs"]
mod tests;
