// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::installation::InstallationId;

#[test]
fn new_ids_carry_the_type_prefix() {
    let id = InstallationId::new();
    assert!(id.as_str().starts_with(InstallationId::PREFIX));
    assert_eq!(id.as_str().len(), InstallationId::PREFIX.len() + 19);
}

#[test]
fn new_ids_are_unique() {
    let a = InstallationId::new();
    let b = InstallationId::new();
    assert_ne!(a, b);
}

#[test]
fn from_string_round_trips() {
    let id = InstallationId::from_string("ins-abc");
    assert_eq!(id.as_str(), "ins-abc");
    assert_eq!(id, "ins-abc");
    assert_eq!(id.to_string(), "ins-abc");
}

#[test]
fn serde_is_transparent() {
    let id = InstallationId::from_string("ins-abc");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"ins-abc\"");
    let back: InstallationId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}
