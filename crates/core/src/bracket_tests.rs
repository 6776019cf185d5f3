// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    twos = { "2v2", Some(Bracket::TwoVTwo) },
    threes = { "3v3", Some(Bracket::ThreeVThree) },
    shuffle = { "Rated Solo Shuffle", Some(Bracket::SoloShuffle) },
    battleground = { "Rated Battleground", None },
    empty = { "", None },
)]
fn log_token_mapping(token: &str, expected: Option<Bracket>) {
    assert_eq!(Bracket::from_log_token(token), expected);
}

#[test]
fn expected_players_per_bracket() {
    assert_eq!(Bracket::TwoVTwo.expected_players(), Some(4));
    assert_eq!(Bracket::ThreeVThree.expected_players(), Some(6));
    assert_eq!(Bracket::SoloShuffle.expected_players(), None);
}

#[test]
fn serde_uses_display_strings() {
    let json = serde_json::to_string(&Bracket::SoloShuffle).unwrap();
    assert_eq!(json, "\"Solo Shuffle\"");

    let parsed: Bracket = serde_json::from_str("\"2v2\"").unwrap();
    assert_eq!(parsed, Bracket::TwoVTwo);
}

#[test]
fn display_matches_serde() {
    for b in [Bracket::TwoVTwo, Bracket::ThreeVThree, Bracket::SoloShuffle] {
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, format!("\"{}\"", b));
    }
}

#[test]
fn only_shuffle_is_shuffle() {
    assert!(Bracket::SoloShuffle.is_shuffle());
    assert!(!Bracket::TwoVTwo.is_shuffle());
    assert!(!Bracket::ThreeVThree.is_shuffle());
}
