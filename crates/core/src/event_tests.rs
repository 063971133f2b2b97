// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn resource_type_wire_strings_round_trip() {
    for rt in ResourceType::ALL {
        assert_eq!(ResourceType::parse(rt.as_str()), Some(*rt));
    }
}

#[test]
fn event_serde_uses_wire_strings() {
    let event = StateChangeEvent::builder()
        .resource_type(ResourceType::ClusterInstallation)
        .old_state("reconciling")
        .new_state("stable")
        .timestamp(99)
        .build();
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["resource_type"], "cluster-installation");
    assert_eq!(json["old_state"], "reconciling");
    assert_eq!(json["new_state"], "stable");
}
