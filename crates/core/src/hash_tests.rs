// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn guids(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[test]
fn compute_is_64_hex() {
    let hash = MatchHash::compute(1_000_000, &guids(&["Player-1", "Player-2"]));
    assert_eq!(hash.as_str().len(), 64);
    assert!(hash.is_well_formed());
}

#[test]
fn player_order_does_not_matter() {
    let a = MatchHash::compute(1_000_000, &guids(&["Player-1", "Player-2", "Player-3"]));
    let b = MatchHash::compute(1_000_000, &guids(&["Player-3", "Player-1", "Player-2"]));
    assert_eq!(a, b);
}

#[test]
fn timestamp_changes_hash() {
    let a = MatchHash::compute(1_000_000, &guids(&["Player-1"]));
    let b = MatchHash::compute(1_000_001, &guids(&["Player-1"]));
    assert_ne!(a, b);
}

#[test]
fn roster_changes_hash() {
    let a = MatchHash::compute(1_000_000, &guids(&["Player-1"]));
    let b = MatchHash::compute(1_000_000, &guids(&["Player-2"]));
    assert_ne!(a, b);
}

#[test]
fn well_formed_rejects_bad_strings() {
    assert!(!MatchHash::from("short").is_well_formed());
    assert!(!MatchHash::from("Z".repeat(64).as_str()).is_well_formed());
    // Uppercase hex is not canonical.
    let upper = MatchHash::compute(1, &[]).as_str().to_uppercase();
    assert!(!MatchHash::from(upper).is_well_formed());
}

#[test]
fn serde_round_trip() {
    let hash = MatchHash::compute(42, &guids(&["Player-1"]));
    let json = serde_json::to_string(&hash).unwrap();
    let parsed: MatchHash = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, hash);
}
