// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::supervisors::test_fixtures::Fixture;
use gantry_core::Installation;
use gantry_store::InstallationFilter;

async fn seed_group(fixture: &Fixture, max_rolling: u64, sequence: u64) -> Group {
    fixture
        .store
        .create_group(Group::builder().max_rolling(max_rolling).sequence(sequence).build())
        .await
        .unwrap()
}

#[tokio::test]
async fn rolls_at_most_max_rolling_members() {
    let fixture = Fixture::new();
    let group = seed_group(&fixture, 1, 5).await;
    for _ in 0..3 {
        fixture
            .seed_group_member(&group, Some(4), InstallationState::Stable)
            .await;
    }

    fixture.group_supervisor().supervise(&group).await;

    let metadata = fixture.store.get_group_rolling_metadata(&group.id).await.unwrap();
    assert_eq!(metadata.installations_rolling, 1, "exactly one member may roll");
    assert_eq!(metadata.ids_to_be_rolled.len(), 2, "two members stay stable");
    // The group lock is released on the way out.
    let stored = fixture.store.get_group(&group.id).await.unwrap().unwrap();
    assert_eq!(stored.lock_acquired_by, None);
}

#[tokio::test]
async fn members_already_rolling_consume_the_budget() {
    let fixture = Fixture::new();
    let group = seed_group(&fixture, 2, 5).await;
    fixture
        .seed_group_member(&group, Some(5), InstallationState::UpdateInProgress)
        .await;
    fixture
        .seed_group_member(&group, Some(5), InstallationState::UpdateInProgress)
        .await;
    let behind = fixture
        .seed_group_member(&group, Some(4), InstallationState::Stable)
        .await;

    fixture.group_supervisor().supervise(&group).await;

    assert_eq!(
        fixture.installation_state(&behind.id).await,
        InstallationState::Stable,
        "budget exhausted by members already rolling"
    );
}

#[tokio::test]
async fn up_to_date_members_are_left_alone() {
    let fixture = Fixture::new();
    let group = seed_group(&fixture, 3, 5).await;
    let current = fixture
        .seed_group_member(&group, Some(5), InstallationState::Stable)
        .await;

    fixture.group_supervisor().supervise(&group).await;

    assert_eq!(fixture.installation_state(&current.id).await, InstallationState::Stable);
    assert!(fixture.producer.events().is_empty());
}

#[tokio::test]
async fn paused_group_rolls_nothing() {
    let fixture = Fixture::new();
    let group = seed_group(&fixture, 0, 5).await;
    let behind = fixture
        .seed_group_member(&group, Some(1), InstallationState::Stable)
        .await;

    fixture.group_supervisor().supervise(&group).await;

    assert_eq!(fixture.installation_state(&behind.id).await, InstallationState::Stable);
}

#[tokio::test]
async fn rolled_members_get_an_event_and_notification() {
    let fixture = Fixture::new();
    let group = seed_group(&fixture, 1, 5).await;
    let behind = fixture
        .seed_group_member(&group, Some(4), InstallationState::Stable)
        .await;

    fixture.group_supervisor().supervise(&group).await;

    assert_eq!(
        fixture.installation_state(&behind.id).await,
        InstallationState::UpdateRequested
    );
    let trail = fixture
        .store
        .get_state_changes(ResourceType::Installation, behind.id.as_str())
        .await
        .unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].new_state, "update-requested");
    assert_eq!(fixture.producer.events().len(), 1);
    // Member lock released after rolling.
    let stored = fixture.store.get_installation(&behind.id).await.unwrap().unwrap();
    assert_eq!(stored.lock_acquired_by, None);
}

#[tokio::test]
async fn members_locked_elsewhere_are_skipped_not_counted() {
    let fixture = Fixture::new();
    let group = seed_group(&fixture, 1, 5).await;
    let locked = fixture
        .seed_group_member(&group, Some(4), InstallationState::Stable)
        .await;
    let free = fixture
        .seed_group_member(&group, Some(4), InstallationState::Stable)
        .await;
    fixture.store.lock_installation(&locked.id, "provisioner-2").await.unwrap();

    fixture.group_supervisor().supervise(&group).await;

    // Exactly one of the two rolled, and it cannot be the locked one.
    assert_eq!(fixture.installation_state(&locked.id).await, InstallationState::Stable);
    assert_eq!(fixture.installation_state(&free.id).await, InstallationState::UpdateRequested);
}

#[tokio::test]
async fn group_locked_elsewhere_is_skipped() {
    let fixture = Fixture::new();
    let group = seed_group(&fixture, 1, 5).await;
    let behind = fixture
        .seed_group_member(&group, Some(4), InstallationState::Stable)
        .await;
    fixture.store.lock_group(&group.id, "provisioner-2").await.unwrap();

    fixture.group_supervisor().supervise(&group).await;

    assert_eq!(fixture.installation_state(&behind.id).await, InstallationState::Stable);
}

#[tokio::test]
async fn seeded_rng_gives_a_deterministic_rollout_order() {
    // Two fixtures with the same seed and the same members must roll the
    // same installation first.
    let first_choice = rollout_choice().await;
    let second_choice = rollout_choice().await;
    assert_eq!(first_choice, second_choice);
}

async fn rollout_choice() -> String {
    let fixture = Fixture::new();
    let mut group = Group::builder().max_rolling(1).sequence(9).build();
    group.id = "grp-rollout".into();
    let group = fixture.store.create_group(group).await.unwrap();
    for name in ["alpha", "beta", "gamma", "delta"] {
        let mut member = Installation::builder()
            .name(name)
            .group_id(group.id.clone())
            .group_sequence(1u64)
            .build();
        member.id = format!("ins-{name}").into();
        fixture.store.create_installation(member).await.unwrap();
    }
    fixture.group_supervisor().supervise(&group).await;
    let metadata = fixture.store.get_group_rolling_metadata(&group.id).await.unwrap();
    assert_eq!(metadata.installations_rolling, 1);
    let rolled = fixture
        .store
        .get_installations(&InstallationFilter {
            states: vec![InstallationState::UpdateRequested],
            ..Default::default()
        })
        .await
        .unwrap();
    rolled[0].name.clone()
}
