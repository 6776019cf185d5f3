// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::strategies::arb_session_state;
use proptest::prelude::*;

#[test]
fn minted_id_has_numeric_prefix() {
    let id = SessionId::mint(1_723_456_789_000);
    let (prefix, rest) = id.as_str().split_once('-').unwrap();
    assert_eq!(prefix, "1723456789000");
    assert_eq!(rest.len(), 8);
}

#[test]
fn minted_ids_are_unique() {
    let a = SessionId::mint(1_000_000);
    let b = SessionId::mint(1_000_000);
    assert_ne!(a, b);
}

#[test]
fn minted_id_is_filename_safe() {
    let id = SessionId::mint(1_000_000);
    assert!(id
        .as_str()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-'));
}

#[test]
fn new_session_is_active() {
    let session = Session::new(SessionId::new("s-1"));
    assert_eq!(session.state, SessionState::Active);
    assert!(!session.duplicate_start_detected);
    assert!(session.completion_reason.is_none());
}

#[test]
fn transition_to_complete() {
    let mut session = Session::new(SessionId::new("s-1"));
    session.transition(SessionState::Complete, None).unwrap();
    assert_eq!(session.state, SessionState::Complete);
}

#[test]
fn transition_to_incomplete_records_reason() {
    let mut session = Session::new(SessionId::new("s-1"));
    session
        .transition(SessionState::Incomplete, Some("zone change".to_string()))
        .unwrap();
    assert_eq!(session.state, SessionState::Incomplete);
    assert_eq!(session.completion_reason.as_deref(), Some("zone change"));
}

#[test]
fn terminal_states_reject_transitions() {
    let mut session = Session::new(SessionId::new("s-1"));
    session.transition(SessionState::Complete, None).unwrap();

    let err = session
        .transition(SessionState::Incomplete, None)
        .unwrap_err();
    assert_eq!(err.current, SessionState::Complete);
    assert_eq!(err.requested, SessionState::Incomplete);
    // State unchanged after the rejected transition.
    assert_eq!(session.state, SessionState::Complete);
}

proptest! {
    // Monotonicity: whatever we request after a terminal transition fails.
    #[test]
    fn no_reentry_after_terminal(first in arb_session_state(), second in arb_session_state()) {
        let mut session = Session::new(SessionId::new("s-1"));
        if session.transition(first, None).is_ok() && first.is_terminal() {
            prop_assert!(session.transition(second, None).is_err());
        }
    }
}
