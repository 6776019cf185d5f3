// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session identity and lifecycle state.
//!
//! A session is the in-memory lifecycle record for one match. Its id is
//! minted by the parser when a match starts and stays stable until the match
//! reaches a terminal state; it doubles as the filename stem for the chunk
//! file and the metadata file.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Alphabet for the random portion of minted ids: filename-safe, no escaping
/// needed anywhere a session id appears.
const ID_ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

crate::define_id! {
    /// Locally-minted identifier for one match.
    ///
    /// The numeric prefix is the match start time in epoch milliseconds, so
    /// reverse-lexicographic filename order approximates reverse-chronological
    /// match order.
    #[derive(Default)]
    pub struct SessionId;
}

impl SessionId {
    /// Mint a fresh id for a match starting at `start_ms`.
    pub fn mint(start_ms: u64) -> Self {
        Self(format!("{}-{}", start_ms, nanoid::nanoid!(8, &ID_ALPHABET)))
    }
}

/// Lifecycle state of a session. Transitions are monotonic: once a session
/// leaves `Active` it never re-enters it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    Complete,
    Incomplete,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionState::Active)
    }
}

crate::simple_display! {
    SessionState {
        Active => "active",
        Complete => "complete",
        Incomplete => "incomplete",
    }
}

/// Rejected session state transition.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("session {session_id} is already {current}, cannot transition to {requested}")]
pub struct SessionTransitionError {
    pub session_id: SessionId,
    pub current: SessionState,
    pub requested: SessionState,
}

/// In-memory lifecycle record for one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub state: SessionState,
    /// Human-readable reason recorded on the `Incomplete` terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_reason: Option<String>,
    /// Set when a second `ARENA_MATCH_START` arrived under this session
    /// (client reload mid-match). Invalidates 2v2/3v3 matches at validation.
    #[serde(default)]
    pub duplicate_start_detected: bool,
}

impl Session {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            state: SessionState::Active,
            completion_reason: None,
            duplicate_start_detected: false,
        }
    }

    /// Apply a terminal transition. Fails if the session already terminated.
    pub fn transition(
        &mut self,
        to: SessionState,
        reason: Option<String>,
    ) -> Result<(), SessionTransitionError> {
        if self.state.is_terminal() {
            return Err(SessionTransitionError {
                session_id: self.session_id.clone(),
                current: self.state,
                requested: to,
            });
        }
        self.state = to;
        self.completion_reason = reason;
        Ok(())
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
